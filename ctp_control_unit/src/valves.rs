//! Tempering and bypass valve control (freeze protection).
//!
//! Above the warm-weather threshold both valves sit at the closed voltage
//! and the valve PID is reset. Below it, the tempering valve tracks the
//! averaged heat-pump loop temperature toward 45 °F, with hard floors by
//! outdoor band and a slew limit so the actuator never slams.
//!
//! Operator-supplied positions always win; with both valves overridden
//! the automatic controller is skipped outright and its state is left
//! untouched.

use tracing::warn;

use ctp_common::{SensorMirror, UiCommands};

use crate::config::EngineConfig;
use crate::pid::pid_step;
use crate::state::PlantState;

/// Commanded valve positions [V].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValvePositions {
    pub bypass: f64,
    pub tempering: f64,
}

/// Run one valve control cycle.
pub fn control(
    cfg: &EngineConfig,
    sensors: &SensorMirror,
    ui: &UiCommands,
    state: &mut PlantState,
) -> ValvePositions {
    let v = &cfg.valves;
    let clamp = |x: f64| x.clamp(v.closed_v, v.open_v);

    // Full manual: both positions supplied, automatic control skipped.
    if let (Some(b), Some(t)) = (ui.bypass_valve_position, ui.tempering_valve_position) {
        return ValvePositions {
            bypass: clamp(b),
            tempering: clamp(t),
        };
    }

    let mut positions = if sensors.outdoor >= v.outdoor_auto_f {
        // Warm regime: both closed, controller state re-armed.
        state.valve_pid.reset();
        state.valve_pid.last_output = v.closed_v;
        ValvePositions {
            bypass: v.closed_v,
            tempering: v.closed_v,
        }
    } else {
        // Cold regime: temper the loop toward the freeze-protection setpoint.
        let prev = state.valve_pid.last_output;
        let hp_loop = (sensors.hp_supply + sensors.hp_return) / 2.0;

        let tempering = match pid_step(
            &mut state.valve_pid,
            &v.pid,
            hp_loop,
            v.loop_setpoint_f,
            v.pid_dt_s,
        ) {
            Ok(terms) => {
                let mut raw = terms.output;
                if sensors.outdoor < v.floor_cold_f {
                    raw = raw.max(v.floor_cold_v);
                } else if sensors.outdoor < v.floor_cool_f {
                    raw = raw.max(v.floor_cool_v);
                }
                clamp(raw.clamp(prev - v.slew_v, prev + v.slew_v))
            }
            Err(e) => {
                warn!(error = %e, "valve PID rejected sample, using fixed fallback");
                if sensors.outdoor < v.floor_cold_f {
                    v.fallback_cold_v
                } else {
                    v.fallback_cool_v
                }
            }
        };
        state.valve_pid.last_output = tempering;

        ValvePositions {
            bypass: v.closed_v,
            tempering,
        }
    };

    // Single-valve overrides ride on top of the automatic result.
    if let Some(b) = ui.bypass_valve_position {
        positions.bypass = clamp(b);
    }
    if let Some(t) = ui.tempering_valve_position {
        positions.tempering = clamp(t);
    }
    positions
}
