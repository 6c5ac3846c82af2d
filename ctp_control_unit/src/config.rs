//! Engine configuration: equipment, thresholds, timings, loop tunings.
//!
//! Every constant the control decision function consumes lives here with a
//! hard default matching the plant commissioning sheet. An optional TOML
//! file can override any block; `validate()` rejects physically
//! inconsistent values before the engine ever runs a cycle.

use std::path::Path;

use serde::{Deserialize, Serialize};

use ctp_common::config::{ConfigError, ConfigLoader};
use ctp_common::{ChannelMap, SafetyBypasses};

use crate::pid::PidParams;

// ─── Equipment ──────────────────────────────────────────────────────

/// Installed equipment and availability flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentConfig {
    /// Opaque tower identifiers, surfaced in logs only.
    pub tower_ids: [String; 3],
    /// Opaque pump identifiers, surfaced in logs only.
    pub pump_ids: [String; 3],
    /// Towers eligible for staging and lead rotation.
    pub tower_available: [bool; 3],
    /// Pumps eligible for rotation and failover.
    pub pump_available: [bool; 3],
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        EquipmentConfig {
            tower_ids: ["CT-1".into(), "CT-2".into(), "CT-3".into()],
            pump_ids: ["CWP-1".into(), "CWP-2".into(), "CWP-3".into()],
            tower_available: [true; 3],
            pump_available: [true; 3],
        }
    }
}

// ─── Staging ────────────────────────────────────────────────────────

/// Staging thresholds and hard limits, all in °F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// ΔT to demand one tower.
    pub stage1_delta: f64,
    /// ΔT to demand two towers.
    pub stage2_delta: f64,
    /// ΔT to demand three towers.
    pub stage3_delta: f64,
    /// ΔT for full-speed three-tower operation.
    pub stage4_delta: f64,
    /// ΔT below which everything shuts down hard.
    pub cold_shutdown_delta: f64,
    /// ΔT below which a running tower is released once its minimum
    /// runtime is met.
    pub release_delta: f64,
    /// ΔT above which running towers are continued regardless of the
    /// stage table.
    pub continuation_delta: f64,
    /// Hard minimum heat-pump supply temperature.
    pub hp_supply_min: f64,
    /// Hard minimum tower supply temperature.
    pub tower_supply_min: f64,
    /// Lead tower rotation period [s].
    pub lead_rotation_period_s: u64,
}

impl Default for StagingConfig {
    fn default() -> Self {
        StagingConfig {
            stage1_delta: 10.0,
            stage2_delta: 20.0,
            stage3_delta: 30.0,
            stage4_delta: 35.0,
            cold_shutdown_delta: -15.0,
            release_delta: -10.0,
            continuation_delta: -5.0,
            hp_supply_min: 65.0,
            tower_supply_min: 50.0,
            lead_rotation_period_s: 7 * 24 * 3600,
        }
    }
}

// ─── Fans ───────────────────────────────────────────────────────────

/// Fan VFD range, ramping, and modulation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    /// Minimum drive voltage; commands below this are coerced to 0 V.
    pub v_min: f64,
    /// Maximum drive voltage.
    pub v_max: f64,
    /// Delay between ramp steps when increasing speed [s].
    pub ramp_up_delay_s: u64,
    /// Delay between ramp steps when decreasing speed [s].
    pub ramp_down_delay_s: u64,
    /// Maximum voltage change per ramp step.
    pub ramp_step_v: f64,
    /// |HP supply − setpoint| band inside which fans hold minimum speed.
    pub maintain_band_f: f64,
    /// Fan modulation PID sample period [s].
    pub pid_dt_s: f64,
    /// Fan modulation PID tuning. Commissioning-adjustable.
    pub pid: PidParams,
    /// Fallback integrator step when the PID rejects a sample [V].
    pub fallback_step_v: f64,
    /// Demand above which the fallback steps up [%].
    pub fallback_up_pct: f64,
    /// Demand below which the fallback steps down [%].
    pub fallback_down_pct: f64,
}

impl Default for FanConfig {
    fn default() -> Self {
        FanConfig {
            v_min: 2.6,
            v_max: 4.8,
            ramp_up_delay_s: 15,
            ramp_down_delay_s: 20,
            ramp_step_v: 0.3,
            maintain_band_f: 2.0,
            pid_dt_s: 15.0,
            pid: PidParams {
                kp: 0.12,
                ki: 0.03,
                kd: 0.0,
                out_min: 2.6,
                out_max: 4.8,
                reverse_acting: true,
                max_integral: 50.0,
            },
            fallback_step_v: 0.1,
            fallback_up_pct: 50.0,
            fallback_down_pct: 30.0,
        }
    }
}

// ─── Equipment Protection ───────────────────────────────────────────

/// Short-cycle protection timings [s].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Minimum tower fan runtime from start.
    pub min_runtime_s: u64,
    /// Minimum tower off time before a restart.
    pub min_off_s: u64,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        ProtectionConfig {
            min_runtime_s: 420,
            min_off_s: 180,
        }
    }
}

// ─── Pumps ──────────────────────────────────────────────────────────

/// Pump rotation, failover, and current limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Changeover overlap during rotation/failover [s].
    pub changeover_overlap_s: u64,
    /// Rotation period [s].
    pub rotation_period_s: u64,
    /// Debounce between failover attempts [s].
    pub failure_debounce_s: u64,
    /// Running current below which the active pump is considered failed [A].
    pub failure_current_a: f64,
    /// Minimum plausible running current [A]. Diagnostic.
    pub min_running_current_a: f64,
    /// Hard maximum pump current [A].
    pub max_current_a: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            changeover_overlap_s: 5,
            rotation_period_s: 7 * 24 * 3600,
            failure_debounce_s: 30,
            failure_current_a: 10.0,
            min_running_current_a: 5.0,
            max_current_a: 45.0,
        }
    }
}

// ─── Monitoring Limits ──────────────────────────────────────────────

/// Vibration and current limits for the safety gate and monitoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Vibration warning threshold [mm/s RMS].
    pub vibration_warning: f64,
    /// Vibration critical threshold [mm/s RMS].
    pub vibration_critical: f64,
    /// VFD current warning threshold [A].
    pub vfd_current_warning: f64,
    /// VFD current critical threshold [A].
    pub vfd_current_critical: f64,
    /// Fan speed ceiling applied to a tower with an active warning [V].
    pub warning_clamp_v: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            vibration_warning: 4.5,
            vibration_critical: 7.1,
            vfd_current_warning: 40.0,
            vfd_current_critical: 45.0,
            warning_clamp_v: 3.5,
        }
    }
}

// ─── Valves ─────────────────────────────────────────────────────────

/// Tempering/bypass valve control tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValveConfig {
    /// Outdoor temperature at/above which valves sit closed [°F].
    pub outdoor_auto_f: f64,
    /// Averaged HP-loop temperature setpoint in the cold regime [°F].
    pub loop_setpoint_f: f64,
    /// Valve PID sample period [s].
    pub pid_dt_s: f64,
    /// Valve PID tuning.
    pub pid: PidParams,
    /// Outdoor band below which the tempering floor is `floor_cold_v`.
    pub floor_cold_f: f64,
    /// Tempering floor below `floor_cold_f` [V].
    pub floor_cold_v: f64,
    /// Outdoor band below which the tempering floor is `floor_cool_v`.
    pub floor_cool_f: f64,
    /// Tempering floor below `floor_cool_f` [V].
    pub floor_cool_v: f64,
    /// Maximum tempering movement per cycle [V].
    pub slew_v: f64,
    /// Fixed fallback position below `floor_cold_f` when the PID fails [V].
    pub fallback_cold_v: f64,
    /// Fixed fallback position otherwise when the PID fails [V].
    pub fallback_cool_v: f64,
    /// Fully-closed command voltage [V].
    pub closed_v: f64,
    /// Fully-open command voltage [V].
    pub open_v: f64,
}

impl Default for ValveConfig {
    fn default() -> Self {
        ValveConfig {
            outdoor_auto_f: 42.0,
            loop_setpoint_f: 45.0,
            pid_dt_s: 7.0,
            pid: PidParams {
                kp: 2.5,
                ki: 0.15,
                kd: 0.05,
                out_min: 2.0,
                out_max: 10.0,
                reverse_acting: false,
                max_integral: 50.0,
            },
            floor_cold_f: 35.0,
            floor_cold_v: 6.8,
            floor_cool_f: 40.0,
            floor_cool_v: 5.2,
            slew_v: 0.4,
            fallback_cold_v: 7.6,
            fallback_cool_v: 6.0,
            closed_v: 2.0,
            open_v: 10.0,
        }
    }
}

// ─── Heaters ────────────────────────────────────────────────────────

/// Basin heater hysteresis band [°F].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaterConfig {
    /// Heaters switch on below this outdoor temperature.
    pub on_below_f: f64,
    /// Heaters switch off above this outdoor temperature.
    pub off_above_f: f64,
}

impl Default for HeaterConfig {
    fn default() -> Self {
        HeaterConfig {
            on_below_f: 35.0,
            off_above_f: 45.0,
        }
    }
}

// ─── Sensor Plausibility ────────────────────────────────────────────

/// Plausibility windows for the sensor sanitizer [°F].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Loop temperature acceptance window.
    pub loop_min_f: f64,
    pub loop_max_f: f64,
    /// Outdoor temperature acceptance window.
    pub outdoor_min_f: f64,
    pub outdoor_max_f: f64,
    /// Setpoint used when the UI never provided one.
    pub default_setpoint_f: f64,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        SanitizeConfig {
            loop_min_f: 40.0,
            loop_max_f: 120.0,
            outdoor_min_f: -20.0,
            outdoor_max_f: 120.0,
            default_setpoint_f: 75.0,
        }
    }
}

// ─── Engine Config ──────────────────────────────────────────────────

/// Complete engine configuration.
///
/// `Default` is the commissioning sheet: every constant in §3 of the plant
/// documentation, with the observed 7 s cycle period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub equipment: EquipmentConfig,
    /// Engaged commissioning bypasses.
    pub bypasses: SafetyBypasses,
    pub staging: StagingConfig,
    pub fan: FanConfig,
    pub protection: ProtectionConfig,
    pub pumps: PumpConfig,
    pub monitor: MonitorConfig,
    pub valves: ValveConfig,
    pub heaters: HeaterConfig,
    pub sanitize: SanitizeConfig,
    pub channels: ChannelMap,
    /// Caller's cycle period [s]; used for pump runtime accrual.
    pub tick_s: f64,
}

impl EngineConfig {
    /// Load from TOML and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = <EngineConfig as ConfigLoader>::load(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject physically inconsistent configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));

        if !(self.fan.v_min > 0.0 && self.fan.v_min < self.fan.v_max) {
            return fail(format!(
                "fan range invalid: v_min={} v_max={}",
                self.fan.v_min, self.fan.v_max
            ));
        }
        if self.fan.ramp_step_v <= 0.0 {
            return fail(format!("fan ramp_step_v must be positive: {}", self.fan.ramp_step_v));
        }
        let s = &self.staging;
        if !(s.stage1_delta < s.stage2_delta
            && s.stage2_delta < s.stage3_delta
            && s.stage3_delta < s.stage4_delta)
        {
            return fail(format!(
                "staging deltas must increase: {} {} {} {}",
                s.stage1_delta, s.stage2_delta, s.stage3_delta, s.stage4_delta
            ));
        }
        if s.cold_shutdown_delta >= s.release_delta || s.release_delta >= s.continuation_delta {
            return fail(format!(
                "shutdown/release/continuation deltas must increase: {} {} {}",
                s.cold_shutdown_delta, s.release_delta, s.continuation_delta
            ));
        }
        let m = &self.monitor;
        if m.vibration_warning >= m.vibration_critical {
            return fail(format!(
                "vibration warning {} must be below critical {}",
                m.vibration_warning, m.vibration_critical
            ));
        }
        if m.vfd_current_warning >= m.vfd_current_critical {
            return fail(format!(
                "VFD current warning {} must be below critical {}",
                m.vfd_current_warning, m.vfd_current_critical
            ));
        }
        let v = &self.valves;
        if !(v.closed_v < v.open_v) {
            return fail(format!(
                "valve range invalid: closed={} open={}",
                v.closed_v, v.open_v
            ));
        }
        if v.slew_v <= 0.0 {
            return fail(format!("valve slew_v must be positive: {}", v.slew_v));
        }
        let h = &self.heaters;
        if h.on_below_f >= h.off_above_f {
            return fail(format!(
                "heater hysteresis inverted: on_below={} off_above={}",
                h.on_below_f, h.off_above_f
            ));
        }
        if self.tick_s <= 0.0 {
            return fail(format!("tick_s must be positive: {}", self.tick_s));
        }
        if !self.equipment.tower_available.iter().any(|a| *a) {
            return fail("no tower is available".into());
        }
        if !self.equipment.pump_available.iter().any(|a| *a) {
            return fail("no pump is available".into());
        }
        for p in [&self.fan.pid, &self.valves.pid] {
            if !(p.out_min < p.out_max) || p.max_integral <= 0.0 {
                return fail(format!("PID limits invalid: {p:?}"));
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            equipment: EquipmentConfig::default(),
            bypasses: SafetyBypasses::empty(),
            staging: StagingConfig::default(),
            fan: FanConfig::default(),
            protection: ProtectionConfig::default(),
            pumps: PumpConfig::default(),
            monitor: MonitorConfig::default(),
            valves: ValveConfig::default(),
            heaters: HeaterConfig::default(),
            sanitize: SanitizeConfig::default(),
            channels: ChannelMap::default(),
            tick_s: 7.0,
        }
    }
}
