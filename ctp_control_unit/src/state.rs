//! Carried plant state.
//!
//! The engine owns no storage: the caller threads one [`PlantState`]
//! value through every cycle and may persist it between process runs.
//! Every stateful mechanism (tower run timers, VFD ramps, PID memories,
//! pump rotation, last-known-good sensors) lives here and is updated in
//! exactly one place per cycle.

use serde::{Deserialize, Serialize};

use ctp_common::{ControlMode, PumpId, Stamp, TowerId};

use crate::pid::PidMemory;

// ─── Tower Run Phase ────────────────────────────────────────────────

/// Run phase of one tower.
///
/// Tagged, so a tower can never simultaneously carry a start and a stop
/// timestamp: the minimum-runtime invariant falls out of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TowerRun {
    /// Off, cooldown elapsed, eligible to start.
    #[default]
    Idle,
    /// Fan commanded on since `since`.
    Running { since: Stamp },
    /// Fan stopped at `since`; held off until the cooldown elapses.
    OffCooldown { since: Stamp },
}

impl TowerRun {
    /// Start timestamp when running.
    pub fn running_since(self) -> Option<Stamp> {
        match self {
            TowerRun::Running { since } => Some(since),
            _ => None,
        }
    }

    /// Stop timestamp when cooling down.
    pub fn stopped_since(self) -> Option<Stamp> {
        match self {
            TowerRun::OffCooldown { since } => Some(since),
            _ => None,
        }
    }

    /// True when the fan is in its run phase.
    pub fn is_running(self) -> bool {
        matches!(self, TowerRun::Running { .. })
    }
}

// ─── VFD Ramp ───────────────────────────────────────────────────────

/// Slew state of one fan VFD output.
///
/// Created when a tower starts, dropped when it stops. The commanded
/// voltage moves toward `target_v` by at most one step per ramp delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampState {
    /// Voltage currently commanded.
    pub current_v: f64,
    /// Voltage the modulation loop wants.
    pub target_v: f64,
    /// When `current_v` last moved.
    pub last_change: Stamp,
}

impl RampState {
    /// Fresh ramp pinned at the startup floor.
    pub fn at(v: f64, now: Stamp) -> Self {
        RampState {
            current_v: v,
            target_v: v,
            last_change: now,
        }
    }
}

// ─── Pumps ──────────────────────────────────────────────────────────

/// An in-flight pump changeover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Changeover {
    /// Pump being brought in.
    pub next: PumpId,
    /// When the overlap began.
    pub since: Stamp,
}

/// Circulation pump supervision state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpState {
    /// The single duty pump.
    pub active: PumpId,
    /// When the current rotation period began.
    pub rotation_start: Stamp,
    /// Overlap changeover in progress, if any.
    pub changeover: Option<Changeover>,
    /// Total failovers since state creation.
    pub failover_count: u32,
    /// Last failover instant, for debounce.
    pub last_failover: Option<Stamp>,
    /// Accumulated runtime per pump [h].
    pub runtime_hours: [f64; 3],
}

impl Default for PumpState {
    fn default() -> Self {
        PumpState {
            active: PumpId::P1,
            rotation_start: Stamp::ZERO,
            changeover: None,
            failover_count: 0,
            last_failover: None,
            runtime_hours: [0.0; 3],
        }
    }
}

// ─── Last-Known-Good Sensors ────────────────────────────────────────

/// Most recent accepted value for each validated temperature.
///
/// Seeded with mild plant temperatures so the first cycles of a cold boot
/// behave sanely even if a probe is already dead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastGoodTemps {
    pub tower_supply: f64,
    pub tower_return: f64,
    pub hp_return: f64,
    pub hp_supply: f64,
    pub outdoor: f64,
}

impl Default for LastGoodTemps {
    fn default() -> Self {
        LastGoodTemps {
            tower_supply: 75.0,
            tower_return: 85.0,
            hp_return: 85.0,
            hp_supply: 75.0,
            outdoor: 60.0,
        }
    }
}

// ─── Plant State ────────────────────────────────────────────────────

/// Complete carried state for the plant, one value per control loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    /// Current lead tower.
    pub lead_tower: TowerId,
    /// When the current lead rotation period began.
    pub lead_rotation_start: Stamp,
    /// Run phase per tower.
    pub tower_run: [TowerRun; 3],
    /// VFD ramp per tower; `None` while the tower is off.
    pub ramp: [Option<RampState>; 3],
    /// Fan modulation PID memory per tower.
    pub fan_pid: [PidMemory; 3],
    /// Tempering valve PID memory.
    pub valve_pid: PidMemory,
    /// Pump supervision state.
    pub pump: PumpState,
    /// Last accepted temperature readings.
    pub last_good: LastGoodTemps,
    /// Basin heater state (hysteresis memory).
    pub heaters_on: [bool; 3],
    /// Persisted system enable (UI-controlled).
    pub system_enabled: bool,
    /// Persisted supervisory mode (UI-controlled).
    pub control_mode: ControlMode,
    /// Cycles executed; gates periodic diagnostics deterministically.
    pub cycle_count: u64,
}

impl Default for PlantState {
    fn default() -> Self {
        PlantState {
            lead_tower: TowerId::T1,
            lead_rotation_start: Stamp::ZERO,
            tower_run: [TowerRun::Idle; 3],
            ramp: [None; 3],
            fan_pid: [PidMemory::default(); 3],
            valve_pid: PidMemory::at_output(2.0),
            pump: PumpState::default(),
            last_good: LastGoodTemps::default(),
            heaters_on: [false; 3],
            system_enabled: true,
            control_mode: ControlMode::Auto,
            cycle_count: 0,
        }
    }
}

impl PlantState {
    /// Seed never-written rotation clocks with the current instant.
    ///
    /// Runs at the top of every cycle so a freshly-defaulted (or
    /// partially-restored) state starts its weekly periods from first
    /// observation instead of the epoch.
    pub fn prime(&mut self, now: Stamp) {
        if self.lead_rotation_start.is_zero() {
            self.lead_rotation_start = now;
        }
        if self.pump.rotation_start.is_zero() {
            self.pump.rotation_start = now;
        }
    }

    /// Number of towers currently in their run phase.
    pub fn running_count(&self) -> usize {
        self.tower_run.iter().filter(|r| r.is_running()).count()
    }

    /// Run phase of one tower.
    pub fn run(&self, t: TowerId) -> TowerRun {
        self.tower_run[t.index()]
    }
}
