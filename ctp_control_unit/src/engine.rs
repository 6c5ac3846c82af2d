//! The per-cycle control decision function.
//!
//! [`step`] is the only entry point the runner calls: a pure transform
//! `(sensors, ui, state) → (commands, state')`. Sub-components execute in
//! the contract order (see the crate docs); the safety gate observes
//! sanitized sensors before any decision, and manual overrides land last
//! so monitoring clamps cannot overrule an operator.
//!
//! The engine commits state only on a successful cycle: `step` works on a
//! copy and, on any internal error, discards it and emits the fully-safe
//! fallback output, leaving the caller's state untouched for recovery.

use thiserror::Error;
use tracing::{debug, error};

use ctp_common::{
    AlarmStatus, ControlMode, FaultCode, OutputSnapshot, RawSnapshot, SensorMirror, SeverityZone,
    Stamp, TowerId, TowerOutput, UiCommands, ValveCmd,
};

use crate::config::EngineConfig;
use crate::state::{PlantState, TowerRun};
use crate::{heaters, merge, monitor, pumps, safety, sanitize, staging, towers, valves};

// ─── Engine Error ───────────────────────────────────────────────────

/// Internal cycle failure. Never escapes [`step`]; it is converted into
/// the fallback output.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EngineError {
    /// A computed output field was NaN or infinite.
    #[error("non-finite output: {field} = {value}")]
    NonFiniteOutput {
        field: &'static str,
        value: f64,
    },
}

// ─── Entry Point ────────────────────────────────────────────────────

/// Run one control cycle.
///
/// On success the carried state advances; on an internal error the state
/// is left exactly as passed in and the returned snapshot is the
/// fully-safe fallback (`alarm_status = Error`, everything de-energized).
pub fn step(
    cfg: &EngineConfig,
    now: Stamp,
    raw: &RawSnapshot,
    ui: &UiCommands,
    state: &mut PlantState,
) -> OutputSnapshot {
    let mut working = state.clone();
    match step_inner(cfg, now, raw, ui, &mut working) {
        Ok(out) => {
            *state = working;
            out
        }
        Err(e) => {
            error!(error = %e, "engine cycle failed, emitting fallback output");
            fallback_output(cfg, now, state)
        }
    }
}

fn step_inner(
    cfg: &EngineConfig,
    now: Stamp,
    raw: &RawSnapshot,
    ui: &UiCommands,
    state: &mut PlantState,
) -> Result<OutputSnapshot, EngineError> {
    state.prime(now);
    state.cycle_count = state.cycle_count.wrapping_add(1);

    let sensors = sanitize::sanitize(cfg, raw, &mut state.last_good);

    merge::persist_mode(ui, state);

    // ── Safety gate ──
    let critical = safety::check_critical(cfg, &sensors);
    if !critical.is_empty() {
        // Timers are deliberately left alone so the minimum-off accounting
        // still applies once the fault clears.
        return Ok(safe_shutdown_output(cfg, now, &sensors, state, &critical));
    }

    // ── System disable ──
    if !state.system_enabled {
        return Ok(disabled_output(cfg, now, &sensors, state));
    }

    // ── Automatic control ──
    staging::rotate_lead(cfg, state, now);
    let decision = staging::decide(cfg, &sensors, state);
    let pump_enables = pumps::supervise(cfg, now, &sensors, &mut state.pump);
    let mut plan = towers::command(cfg, now, &sensors, &decision, state);
    towers::enforce_runtime(cfg, now, &sensors, &decision, &mut plan, state);
    let valve_pos = valves::control(cfg, &sensors, ui, state);
    let heater_on = heaters::control(cfg, &sensors, state);
    let warnings = monitor::check_warnings(cfg, &sensors, &mut plan);

    if state.cycle_count % 128 == 0 {
        debug!(
            cycle = state.cycle_count,
            delta_t = decision.delta_t,
            demand = decision.demand_pct,
            demanded = decision.demanded,
            lead = %state.lead_tower,
            "cycle diagnostics"
        );
    }

    // ── Assembly ──
    let mut out = base_output(cfg, now, &sensors, state);
    for t in TowerId::ALL {
        let i = t.index();
        out.towers[i] = TowerOutput {
            vfd_enable: plan.enable[i],
            fan_speed: plan.speed[i],
            valve: plan.valve[i],
            heater_enable: heater_on[i],
        };
    }
    out.pumps = pump_enables;
    out.bypass_valve_position = valve_pos.bypass;
    out.tempering_valve_position = valve_pos.tempering;
    out.cooling_demand = decision.demand_pct;
    out.loop_delta_t = decision.delta_t;

    let mut alarm = AlarmStatus::Normal;
    if !warnings.is_empty() {
        alarm = alarm.escalate(AlarmStatus::Warning);
    }
    out.alarm_status = alarm;
    out.fault_conditions = warnings.iter().map(FaultCode::to_string).collect();
    out.fault_conditions.extend(
        plan.blocked
            .iter()
            .map(|t| FaultCode::TowerStartBlocked(*t).to_string()),
    );

    // ── Manual merge (last) ──
    merge::apply(cfg, ui, &mut out, state);

    validate_finite(&out)?;
    Ok(out)
}

// ─── Output Builders ────────────────────────────────────────────────

/// Shared skeleton: mirrors, diagnostics, identity fields. Every output
/// path starts from this.
fn base_output(
    cfg: &EngineConfig,
    now: Stamp,
    sensors: &SensorMirror,
    state: &PlantState,
) -> OutputSnapshot {
    let mut zones = [SeverityZone::A; 3];
    for t in TowerId::ALL {
        zones[t.index()] = SeverityZone::from_velocity(sensors.vibration[t.index()]);
    }
    OutputSnapshot {
        towers: [TowerOutput::default(); 3],
        pumps: [false; 3],
        bypass_valve_position: cfg.valves.closed_v,
        tempering_valve_position: cfg.valves.closed_v,
        alarm_status: AlarmStatus::Normal,
        fault_conditions: Vec::new(),
        safety_bypasses: cfg.bypasses.active_names().iter().map(|s| s.to_string()).collect(),
        lead_tower: state.lead_tower,
        active_towers: 0,
        cooling_demand: 0.0,
        loop_delta_t: sensors.hp_supply - sensors.setpoint,
        target_supply_temp: sensors.setpoint,
        control_mode: state.control_mode,
        system_enabled: state.system_enabled,
        sensors: *sensors,
        vibration_zones: zones,
        pump_runtime_hours: state.pump.runtime_hours,
        stamp: now,
    }
}

/// Critical-fault output: everything de-energized, valves driven closed,
/// heaters held in their last known state.
fn safe_shutdown_output(
    cfg: &EngineConfig,
    now: Stamp,
    sensors: &SensorMirror,
    state: &PlantState,
    faults: &[FaultCode],
) -> OutputSnapshot {
    let mut out = base_output(cfg, now, sensors, state);
    for t in TowerId::ALL {
        out.towers[t.index()] = TowerOutput {
            vfd_enable: false,
            fan_speed: 0.0,
            valve: ValveCmd::Close,
            heater_enable: state.heaters_on[t.index()],
        };
    }
    out.alarm_status = AlarmStatus::Critical;
    out.fault_conditions = faults.iter().map(FaultCode::to_string).collect();
    out
}

/// Operator-disabled output: plant idled, no alarm.
fn disabled_output(
    cfg: &EngineConfig,
    now: Stamp,
    sensors: &SensorMirror,
    state: &mut PlantState,
) -> OutputSnapshot {
    // Running towers take one Running → OffCooldown transition so a
    // re-enable still honors the minimum off time.
    for t in TowerId::ALL {
        let i = t.index();
        if state.tower_run[i].is_running() {
            state.tower_run[i] = TowerRun::OffCooldown { since: now };
            state.ramp[i] = None;
        }
    }
    let mut out = base_output(cfg, now, sensors, state);
    for t in TowerId::ALL {
        out.towers[t.index()] = TowerOutput {
            vfd_enable: false,
            fan_speed: 0.0,
            valve: ValveCmd::Close,
            heater_enable: state.heaters_on[t.index()],
        };
    }
    out
}

/// Fully-safe fallback for an internal engine failure. Built from the
/// untouched caller state; heaters are forced off on this path.
fn fallback_output(cfg: &EngineConfig, now: Stamp, state: &PlantState) -> OutputSnapshot {
    let mut out = base_output(cfg, now, &SensorMirror::default(), state);
    for t in TowerId::ALL {
        out.towers[t.index()] = TowerOutput {
            vfd_enable: false,
            fan_speed: 0.0,
            valve: ValveCmd::Close,
            heater_enable: false,
        };
    }
    out.alarm_status = AlarmStatus::Error;
    out.control_mode = ControlMode::Error;
    out.fault_conditions = vec![FaultCode::ControlSystemError.to_string()];
    out
}

/// Guard against NaN/infinite commands leaking to the actuation side.
fn validate_finite(out: &OutputSnapshot) -> Result<(), EngineError> {
    for tower in &out.towers {
        if !tower.fan_speed.is_finite() {
            return Err(EngineError::NonFiniteOutput {
                field: "tower_fan_speed",
                value: tower.fan_speed,
            });
        }
    }
    let checks: [(&'static str, f64); 3] = [
        ("bypass_valve", out.bypass_valve_position),
        ("tempering_valve", out.tempering_valve_position),
        ("cooling_demand", out.cooling_demand),
    ];
    for (field, value) in checks {
        if !value.is_finite() {
            return Err(EngineError::NonFiniteOutput { field, value });
        }
    }
    Ok(())
}
