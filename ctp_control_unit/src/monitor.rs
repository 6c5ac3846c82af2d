//! Warning-level monitoring pass.
//!
//! Runs after the automatic decisions: raises warning faults for VFD
//! currents and vibrations inside the warning band and pulls the
//! offending tower's fan back to the reduced-speed ceiling. Critical
//! levels never reach this pass; the safety gate has already
//! short-circuited the cycle.

use tracing::warn;

use ctp_common::{FaultCode, SensorMirror, TowerId};

use crate::config::EngineConfig;
use crate::towers::TowerPlan;

/// Evaluate warning conditions and clamp offending fan speeds.
pub fn check_warnings(
    cfg: &EngineConfig,
    sensors: &SensorMirror,
    plan: &mut TowerPlan,
) -> Vec<FaultCode> {
    let m = &cfg.monitor;
    let mut faults = Vec::new();

    for t in TowerId::ALL {
        let i = t.index();
        let mut clamp = false;

        let legs = sensors.vfd_current[i];
        let current = legs[0].max(legs[1]);
        if current >= m.vfd_current_warning && current < m.vfd_current_critical {
            faults.push(FaultCode::TowerVfdCurrentWarning(t));
            clamp = true;
        }

        let vib = sensors.vibration[i];
        if vib >= m.vibration_warning && vib <= m.vibration_critical {
            faults.push(FaultCode::TowerVibrationWarning(t));
            clamp = true;
        }

        if clamp && plan.speed[i] > m.warning_clamp_v {
            warn!(
                tower = %t,
                from = plan.speed[i],
                to = m.warning_clamp_v,
                "warning active, clamping fan speed"
            );
            plan.speed[i] = m.warning_clamp_v;
        }
    }

    faults
}
