//! Fault codes, alarm levels, safety bypasses, and vibration severity.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ids::{PumpId, TowerId};

// ─── Alarm Status ───────────────────────────────────────────────────

/// Overall alarm level of one output snapshot.
///
/// Levels only escalate within a cycle: `Critical` and `Error` are never
/// downgraded by a later warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStatus {
    /// No active faults.
    #[default]
    Normal,
    /// Warning-level conditions present; plant keeps running.
    Warning,
    /// Critical hardware fault; plant is in safe shutdown.
    Critical,
    /// The engine itself failed; outputs are the fully-safe fallback.
    Error,
}

impl AlarmStatus {
    /// Escalate to `other` if it is more severe.
    pub fn escalate(self, other: AlarmStatus) -> AlarmStatus {
        if (other as u8) > (self as u8) {
            other
        } else {
            self
        }
    }

    /// Stable lowercase name, as published in telemetry.
    pub const fn as_str(self) -> &'static str {
        match self {
            AlarmStatus::Normal => "normal",
            AlarmStatus::Warning => "warning",
            AlarmStatus::Critical => "critical",
            AlarmStatus::Error => "error",
        }
    }
}

// ─── Fault Codes ────────────────────────────────────────────────────

/// One entry of the `faultConditions` output list.
///
/// `Display` yields the stable wire string consumed by the UI and the
/// telemetry reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultCode {
    /// Tower RMS vibration above the critical limit.
    TowerVibrationCritical(TowerId),
    /// Tower VFD leg current above the critical limit.
    TowerVfdOvercurrent(TowerId),
    /// Pump current above the hard maximum.
    PumpOvercurrent(PumpId),
    /// Tower RMS vibration in the warning band.
    TowerVibrationWarning(TowerId),
    /// Tower VFD leg current in the warning band.
    TowerVfdCurrentWarning(TowerId),
    /// Staging wanted this tower but its off cooldown has not elapsed.
    TowerStartBlocked(TowerId),
    /// The engine hit an internal error and produced the fallback output.
    ControlSystemError,
}

impl FaultCode {
    /// Whether this code is critical (forces safe shutdown).
    pub const fn is_critical(self) -> bool {
        matches!(
            self,
            FaultCode::TowerVibrationCritical(_)
                | FaultCode::TowerVfdOvercurrent(_)
                | FaultCode::PumpOvercurrent(_)
        )
    }

    /// Whether this code is warning-level.
    pub const fn is_warning(self) -> bool {
        matches!(
            self,
            FaultCode::TowerVibrationWarning(_) | FaultCode::TowerVfdCurrentWarning(_)
        )
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCode::TowerVibrationCritical(t) => {
                write!(f, "TOWER{t}_HIGH_VIBRATION_CRITICAL")
            }
            FaultCode::TowerVfdOvercurrent(t) => write!(f, "TOWER{t}_CRITICAL_VFD_CURRENT"),
            FaultCode::PumpOvercurrent(p) => write!(f, "PUMP{p}_OVERCURRENT"),
            FaultCode::TowerVibrationWarning(t) => write!(f, "TOWER{t}_VIBRATION_WARNING"),
            FaultCode::TowerVfdCurrentWarning(t) => write!(f, "TOWER{t}_VFD_CURRENT_WARNING"),
            FaultCode::TowerStartBlocked(t) => write!(f, "TOWER{t}_START_BLOCKED_BY_COOLDOWN"),
            FaultCode::ControlSystemError => write!(f, "CONTROL_SYSTEM_ERROR"),
        }
    }
}

// ─── Safety Bypasses ────────────────────────────────────────────────

bitflags! {
    /// Commissioning bypass switches, one per safety domain.
    ///
    /// A set bit suppresses the corresponding interlock. Bypasses are
    /// boot-time configuration, surfaced verbatim in every output snapshot
    /// so an engaged bypass is always visible to operators.
    ///
    /// Serde impls come from the `bitflags` serde feature (text format,
    /// e.g. `"VIBRATION | CURRENT"` in TOML).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SafetyBypasses: u8 {
        const EMERGENCY_STOP = 1 << 0;
        const WATER_LEVEL    = 1 << 1;
        const VIBRATION      = 1 << 2;
        const CURRENT        = 1 << 3;
        const PUMP_STATUS    = 1 << 4;
        const VFD_FAULT      = 1 << 5;
    }
}

impl Default for SafetyBypasses {
    fn default() -> Self {
        SafetyBypasses::empty()
    }
}

impl SafetyBypasses {
    /// Names of all engaged bypasses, for the `safetyBypasses` output list.
    pub fn active_names(self) -> Vec<&'static str> {
        [
            (SafetyBypasses::EMERGENCY_STOP, "EMERGENCY_STOP"),
            (SafetyBypasses::WATER_LEVEL, "WATER_LEVEL"),
            (SafetyBypasses::VIBRATION, "VIBRATION"),
            (SafetyBypasses::CURRENT, "CURRENT"),
            (SafetyBypasses::PUMP_STATUS, "PUMP_STATUS"),
            (SafetyBypasses::VFD_FAULT, "VFD_FAULT"),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| *name)
        .collect()
    }
}

// ─── Vibration Severity ─────────────────────────────────────────────

/// ISO 10816-style vibration severity zone for a tower fan assembly.
///
/// Diagnostic only; the control decisions use the raw warning/critical
/// thresholds, not the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeverityZone {
    /// Good: newly commissioned condition.
    #[default]
    A,
    /// Acceptable for unrestricted long-term operation.
    B,
    /// Unsatisfactory for long-term operation.
    C,
    /// Severe enough to cause damage.
    D,
}

impl SeverityZone {
    /// Classify an RMS velocity reading [mm/s].
    pub fn from_velocity(mm_s: f64) -> SeverityZone {
        if mm_s <= 2.8 {
            SeverityZone::A
        } else if mm_s <= 4.5 {
            SeverityZone::B
        } else if mm_s <= 7.1 {
            SeverityZone::C
        } else {
            SeverityZone::D
        }
    }

    /// Stable single-letter name for telemetry.
    pub const fn as_str(self) -> &'static str {
        match self {
            SeverityZone::A => "A",
            SeverityZone::B => "B",
            SeverityZone::C => "C",
            SeverityZone::D => "D",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_escalates_but_never_downgrades() {
        assert_eq!(
            AlarmStatus::Normal.escalate(AlarmStatus::Warning),
            AlarmStatus::Warning
        );
        assert_eq!(
            AlarmStatus::Critical.escalate(AlarmStatus::Warning),
            AlarmStatus::Critical
        );
        assert_eq!(
            AlarmStatus::Error.escalate(AlarmStatus::Critical),
            AlarmStatus::Error
        );
    }

    #[test]
    fn fault_code_wire_strings() {
        assert_eq!(
            FaultCode::TowerVibrationCritical(TowerId::T2).to_string(),
            "TOWER2_HIGH_VIBRATION_CRITICAL"
        );
        assert_eq!(
            FaultCode::TowerVfdOvercurrent(TowerId::T1).to_string(),
            "TOWER1_CRITICAL_VFD_CURRENT"
        );
        assert_eq!(
            FaultCode::PumpOvercurrent(PumpId::P3).to_string(),
            "PUMP3_OVERCURRENT"
        );
        assert_eq!(
            FaultCode::ControlSystemError.to_string(),
            "CONTROL_SYSTEM_ERROR"
        );
    }

    #[test]
    fn critical_and_warning_split() {
        assert!(FaultCode::PumpOvercurrent(PumpId::P1).is_critical());
        assert!(!FaultCode::PumpOvercurrent(PumpId::P1).is_warning());
        assert!(FaultCode::TowerVibrationWarning(TowerId::T1).is_warning());
        assert!(!FaultCode::TowerStartBlocked(TowerId::T1).is_critical());
    }

    #[test]
    fn bypass_names_follow_bits() {
        let b = SafetyBypasses::VIBRATION | SafetyBypasses::PUMP_STATUS;
        assert_eq!(b.active_names(), vec!["VIBRATION", "PUMP_STATUS"]);
        assert!(SafetyBypasses::empty().active_names().is_empty());
    }

    #[test]
    fn severity_zone_boundaries() {
        assert_eq!(SeverityZone::from_velocity(1.0), SeverityZone::A);
        assert_eq!(SeverityZone::from_velocity(2.8), SeverityZone::A);
        assert_eq!(SeverityZone::from_velocity(4.5), SeverityZone::B);
        assert_eq!(SeverityZone::from_velocity(4.51), SeverityZone::C);
        assert_eq!(SeverityZone::from_velocity(7.1), SeverityZone::C);
        assert_eq!(SeverityZone::from_velocity(7.2), SeverityZone::D);
    }
}
