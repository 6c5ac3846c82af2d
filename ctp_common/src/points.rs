//! I/O point records crossing the engine boundary.
//!
//! Three records make up the engine's external contract:
//! [`RawSnapshot`] (acquisition → engine), [`UiCommands`] (UI → engine),
//! and [`OutputSnapshot`] (engine → actuation/telemetry). The
//! [`ChannelMap`] names which raw channel feeds which engineering value so
//! a miswired commissioning can be corrected in configuration rather than
//! code.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::fault::{AlarmStatus, SeverityZone};
use crate::ids::{PumpId, TowerId};
use crate::time::Stamp;

// ─── Raw Snapshot ───────────────────────────────────────────────────

/// One cycle's worth of raw acquisition values, keyed by channel ID.
///
/// Values arrive as strings in engineering units per the acquisition
/// contract; the engine's sanitizer owns parsing and plausibility checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Channel ID → raw value string (e.g. `"CH10" → "88.4"`).
    pub channels: HashMap<String, String>,
    /// Acquisition timestamp.
    pub stamp: Stamp,
}

impl RawSnapshot {
    /// Build a snapshot from `(channel, value)` pairs. Test/sim helper.
    pub fn from_pairs<I, K, V>(stamp: Stamp, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        RawSnapshot {
            channels: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
            stamp,
        }
    }

    /// Raw string for a channel, if present.
    pub fn get(&self, channel: &str) -> Option<&str> {
        self.channels.get(channel).map(String::as_str)
    }
}

// ─── Channel Map ────────────────────────────────────────────────────

/// Maps engineering values to raw channel IDs.
///
/// Defaults follow the legacy field wiring. The two historical source
/// variants disagreed on the loop-temperature channels; keeping the map in
/// configuration lets commissioning swap them without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    /// Tower loop supply temperature [°F].
    pub tower_supply: String,
    /// Tower loop return temperature [°F].
    pub tower_return: String,
    /// Heat-pump loop return temperature [°F].
    pub hp_return: String,
    /// Heat-pump loop supply temperature [°F].
    pub hp_supply: String,
    /// Outdoor air temperature [°F].
    pub outdoor: String,
    /// Operator setpoint [°F].
    pub setpoint: String,
    /// Two VFD leg currents per tower [A].
    pub vfd_current: [[String; 2]; 3],
    /// One current per pump [A].
    pub pump_current: [String; 3],
    /// One RMS vibration velocity per tower [mm/s].
    pub vibration: [String; 3],
}

impl Default for ChannelMap {
    fn default() -> Self {
        ChannelMap {
            tower_supply: "CH1".into(),
            tower_return: "CH2".into(),
            hp_return: "CH9".into(),
            hp_supply: "CH10".into(),
            outdoor: "outdoorTemp".into(),
            setpoint: "userSetpoint".into(),
            vfd_current: [
                ["AI1".into(), "AI2".into()],
                ["AI3".into(), "AI4".into()],
                ["AI5".into(), "AI6".into()],
            ],
            pump_current: ["CH8".into(), "CH5".into(), "CH6".into()],
            vibration: ["WTV801_1".into(), "WTV801_2".into(), "WTV801_3".into()],
        }
    }
}

// ─── UI Commands ────────────────────────────────────────────────────

/// Supervisory control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Engine decides everything.
    #[default]
    Auto,
    /// Operator overrides are expected; automatic decisions still computed.
    Manual,
    /// The engine failed; outputs are the fallback set.
    Error,
}

/// Optional operator overrides for one cycle.
///
/// Field names mirror the UI wire contract. Absent fields leave the
/// automatic decision in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiCommands {
    #[serde(rename = "systemEnabled")]
    pub system_enabled: Option<bool>,
    #[serde(rename = "controlMode")]
    pub control_mode: Option<ControlMode>,
    #[serde(rename = "tower1VFDEnable")]
    pub tower1_vfd_enable: Option<bool>,
    #[serde(rename = "tower2VFDEnable")]
    pub tower2_vfd_enable: Option<bool>,
    #[serde(rename = "tower3VFDEnable")]
    pub tower3_vfd_enable: Option<bool>,
    #[serde(rename = "tower1FanSpeed")]
    pub tower1_fan_speed: Option<f64>,
    #[serde(rename = "tower2FanSpeed")]
    pub tower2_fan_speed: Option<f64>,
    #[serde(rename = "tower3FanSpeed")]
    pub tower3_fan_speed: Option<f64>,
    #[serde(rename = "tower1HeaterEnable")]
    pub tower1_heater_enable: Option<bool>,
    #[serde(rename = "tower2HeaterEnable")]
    pub tower2_heater_enable: Option<bool>,
    #[serde(rename = "tower3HeaterEnable")]
    pub tower3_heater_enable: Option<bool>,
    #[serde(rename = "bypassValvePosition")]
    pub bypass_valve_position: Option<f64>,
    #[serde(rename = "temperingValvePosition")]
    pub tempering_valve_position: Option<f64>,
}

impl UiCommands {
    /// VFD enable override for one tower.
    pub fn vfd_enable(&self, t: TowerId) -> Option<bool> {
        match t {
            TowerId::T1 => self.tower1_vfd_enable,
            TowerId::T2 => self.tower2_vfd_enable,
            TowerId::T3 => self.tower3_vfd_enable,
        }
    }

    /// Fan speed override for one tower [V].
    pub fn fan_speed(&self, t: TowerId) -> Option<f64> {
        match t {
            TowerId::T1 => self.tower1_fan_speed,
            TowerId::T2 => self.tower2_fan_speed,
            TowerId::T3 => self.tower3_fan_speed,
        }
    }

    /// Heater enable override for one tower.
    pub fn heater_enable(&self, t: TowerId) -> Option<bool> {
        match t {
            TowerId::T1 => self.tower1_heater_enable,
            TowerId::T2 => self.tower2_heater_enable,
            TowerId::T3 => self.tower3_heater_enable,
        }
    }
}

// ─── Output Snapshot ────────────────────────────────────────────────

/// Isolation valve command for one tower.
///
/// Tri-state by construction, so "open" and "close" can never be asserted
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveCmd {
    /// Drive the valve open.
    Open,
    /// Drive the valve closed.
    Close,
    /// Leave the valve where it is.
    #[default]
    Hold,
}

impl ValveCmd {
    /// The "open" relay command.
    pub const fn open_asserted(self) -> bool {
        matches!(self, ValveCmd::Open)
    }

    /// The "close" relay command.
    pub const fn close_asserted(self) -> bool {
        matches!(self, ValveCmd::Close)
    }
}

/// Commanded outputs for one tower.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TowerOutput {
    /// Fan VFD run enable.
    pub vfd_enable: bool,
    /// Fan speed command [V]; 0 V means drive disabled.
    pub fan_speed: f64,
    /// Isolation valve command.
    pub valve: ValveCmd,
    /// Basin freeze-protection heater enable.
    pub heater_enable: bool,
}

/// Sanitized sensor readings mirrored into the output snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorMirror {
    pub tower_supply: f64,
    pub tower_return: f64,
    pub hp_return: f64,
    pub hp_supply: f64,
    pub outdoor: f64,
    pub setpoint: f64,
    /// Two VFD leg currents per tower [A].
    pub vfd_current: [[f64; 2]; 3],
    /// One current per pump [A].
    pub pump_current: [f64; 3],
    /// RMS vibration velocity per tower [mm/s].
    pub vibration: [f64; 3],
}

impl SensorMirror {
    /// Tower range: return minus supply [°F]. Diagnostic.
    pub fn tower_range(&self) -> f64 {
        self.tower_return - self.tower_supply
    }
}

/// The complete command snapshot produced by one engine cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputSnapshot {
    /// Per-tower commands, indexed by [`TowerId::index`].
    pub towers: [TowerOutput; 3],
    /// Per-pump run enables, indexed by [`PumpId::index`].
    pub pumps: [bool; 3],
    /// Bypass valve position command [V], clamped to [2.0, 10.0].
    pub bypass_valve_position: f64,
    /// Tempering valve position command [V], clamped to [2.0, 10.0].
    pub tempering_valve_position: f64,
    /// Overall alarm level.
    pub alarm_status: AlarmStatus,
    /// Active fault condition strings.
    pub fault_conditions: Vec<String>,
    /// Names of engaged safety bypasses.
    pub safety_bypasses: Vec<String>,
    /// Current lead tower.
    pub lead_tower: TowerId,
    /// Number of towers with the fan commanded on.
    pub active_towers: u8,
    /// Cooling demand [%].
    pub cooling_demand: f64,
    /// HP supply minus setpoint [°F].
    pub loop_delta_t: f64,
    /// Target supply temperature (the effective setpoint) [°F].
    pub target_supply_temp: f64,
    /// Supervisory mode in effect.
    pub control_mode: ControlMode,
    /// System enable in effect.
    pub system_enabled: bool,
    /// Sanitized sensor readings this cycle.
    pub sensors: SensorMirror,
    /// Vibration severity zone per tower.
    pub vibration_zones: [SeverityZone; 3],
    /// Accumulated runtime per pump [h].
    pub pump_runtime_hours: [f64; 3],
    /// Cycle timestamp.
    pub stamp: Stamp,
}

impl OutputSnapshot {
    /// Tower output by ID.
    pub fn tower(&self, t: TowerId) -> &TowerOutput {
        &self.towers[t.index()]
    }

    /// Pump enable by ID.
    pub fn pump(&self, p: PumpId) -> bool {
        self.pumps[p.index()]
    }
}
