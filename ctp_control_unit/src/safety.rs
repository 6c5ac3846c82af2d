//! Critical safety gate.
//!
//! Runs immediately after sanitizing, before any control decision. A
//! critical fault short-circuits the whole cycle into the safe-shutdown
//! output: fans off, isolation valves driven closed, pumps off, valves at
//! the closed voltage. Tower timers are untouched on that path so the
//! minimum-off accounting still applies once the fault clears.

use tracing::error;

use ctp_common::{FaultCode, PumpId, SafetyBypasses, SensorMirror, TowerId};

use crate::config::EngineConfig;

/// Evaluate all critical fault conditions under their bypass flags.
///
/// Returns the (possibly empty) list of critical faults.
pub fn check_critical(cfg: &EngineConfig, sensors: &SensorMirror) -> Vec<FaultCode> {
    let mut faults = Vec::new();
    let m = &cfg.monitor;

    if !cfg.bypasses.contains(SafetyBypasses::VIBRATION) {
        for t in TowerId::ALL {
            if sensors.vibration[t.index()] > m.vibration_critical {
                faults.push(FaultCode::TowerVibrationCritical(t));
            }
        }
    }

    if !cfg.bypasses.contains(SafetyBypasses::CURRENT) {
        for t in TowerId::ALL {
            let legs = sensors.vfd_current[t.index()];
            if legs[0] > m.vfd_current_critical || legs[1] > m.vfd_current_critical {
                faults.push(FaultCode::TowerVfdOvercurrent(t));
            }
        }
        for p in PumpId::ALL {
            if sensors.pump_current[p.index()] > cfg.pumps.max_current_a {
                faults.push(FaultCode::PumpOvercurrent(p));
            }
        }
    }

    for fault in &faults {
        error!(%fault, "critical safety fault");
    }
    faults
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_sensors() -> SensorMirror {
        SensorMirror {
            tower_supply: 75.0,
            tower_return: 85.0,
            hp_return: 85.0,
            hp_supply: 85.0,
            outdoor: 80.0,
            setpoint: 75.0,
            ..SensorMirror::default()
        }
    }

    #[test]
    fn quiet_plant_has_no_faults() {
        let cfg = EngineConfig::default();
        assert!(check_critical(&cfg, &quiet_sensors()).is_empty());
    }

    #[test]
    fn critical_vibration_detected_per_tower() {
        let cfg = EngineConfig::default();
        let mut s = quiet_sensors();
        s.vibration[1] = 7.2;
        let faults = check_critical(&cfg, &s);
        assert_eq!(faults, vec![FaultCode::TowerVibrationCritical(TowerId::T2)]);

        // Exactly at the limit is not critical (strictly above).
        s.vibration[1] = 7.1;
        assert!(check_critical(&cfg, &s).is_empty());
    }

    #[test]
    fn either_vfd_leg_can_trip() {
        let cfg = EngineConfig::default();
        let mut s = quiet_sensors();
        s.vfd_current[2][1] = 45.5;
        let faults = check_critical(&cfg, &s);
        assert_eq!(faults, vec![FaultCode::TowerVfdOvercurrent(TowerId::T3)]);
    }

    #[test]
    fn pump_overcurrent_detected() {
        let cfg = EngineConfig::default();
        let mut s = quiet_sensors();
        s.pump_current[0] = 46.0;
        let faults = check_critical(&cfg, &s);
        assert_eq!(faults, vec![FaultCode::PumpOvercurrent(PumpId::P1)]);
    }

    #[test]
    fn vibration_bypass_suppresses_vibration_only() {
        let mut cfg = EngineConfig::default();
        cfg.bypasses = SafetyBypasses::VIBRATION;
        let mut s = quiet_sensors();
        s.vibration[0] = 9.0;
        s.pump_current[1] = 50.0;
        let faults = check_critical(&cfg, &s);
        assert_eq!(faults, vec![FaultCode::PumpOvercurrent(PumpId::P2)]);
    }

    #[test]
    fn current_bypass_suppresses_both_current_checks() {
        let mut cfg = EngineConfig::default();
        cfg.bypasses = SafetyBypasses::CURRENT;
        let mut s = quiet_sensors();
        s.vfd_current[0][0] = 50.0;
        s.pump_current[2] = 50.0;
        assert!(check_critical(&cfg, &s).is_empty());
    }

    #[test]
    fn multiple_faults_accumulate() {
        let cfg = EngineConfig::default();
        let mut s = quiet_sensors();
        s.vibration[0] = 8.0;
        s.vibration[2] = 7.5;
        s.vfd_current[1][0] = 46.0;
        let faults = check_critical(&cfg, &s);
        assert_eq!(faults.len(), 3);
        assert!(faults.contains(&FaultCode::TowerVibrationCritical(TowerId::T1)));
        assert!(faults.contains(&FaultCode::TowerVibrationCritical(TowerId::T3)));
        assert!(faults.contains(&FaultCode::TowerVfdOvercurrent(TowerId::T2)));
    }
}
