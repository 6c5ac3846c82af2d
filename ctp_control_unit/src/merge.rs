//! Manual override merge.
//!
//! The last pass of the cycle: operator commands are authoritative over
//! everything except the safety gate, which has already run. In
//! particular a warning-triggered speed clamp must not override an
//! explicit operator speed, which is why this pass runs after monitoring.

use tracing::info;

use ctp_common::{OutputSnapshot, TowerId, UiCommands, ValveCmd};

use crate::config::EngineConfig;
use crate::state::PlantState;

/// Apply UI overrides onto the assembled output snapshot.
pub fn apply(
    cfg: &EngineConfig,
    ui: &UiCommands,
    out: &mut OutputSnapshot,
    state: &mut PlantState,
) {
    // System enable and mode were persisted into state at the top of the
    // cycle; mirror them here so the output reflects this tick's command.
    out.system_enabled = state.system_enabled;
    out.control_mode = state.control_mode;

    for t in TowerId::ALL {
        let i = t.index();

        if let Some(enable) = ui.vfd_enable(t) {
            info!(tower = %t, enable, "operator VFD override");
            out.towers[i].vfd_enable = enable;
            if enable {
                out.towers[i].valve = ValveCmd::Open;
                if out.towers[i].fan_speed < cfg.fan.v_min {
                    out.towers[i].fan_speed = cfg.fan.v_min;
                }
            } else {
                out.towers[i].fan_speed = 0.0;
                out.towers[i].valve = ValveCmd::Close;
            }
        }

        if let Some(speed) = ui.fan_speed(t) {
            // Keep the commanded voltage out of the dead band below v_min.
            out.towers[i].fan_speed = if speed <= 0.0 {
                0.0
            } else {
                speed.clamp(cfg.fan.v_min, cfg.fan.v_max)
            };
        }

        if let Some(heater) = ui.heater_enable(t) {
            out.towers[i].heater_enable = heater;
            // Feed the hysteresis memory so the automatic controller does
            // not flip it straight back inside the band.
            state.heaters_on[i] = heater;
        }
    }

    let clamp_valve = |v: f64| v.clamp(cfg.valves.closed_v, cfg.valves.open_v);
    if let Some(b) = ui.bypass_valve_position {
        out.bypass_valve_position = clamp_valve(b);
    }
    if let Some(t) = ui.tempering_valve_position {
        out.tempering_valve_position = clamp_valve(t);
    }

    out.active_towers = out.towers.iter().filter(|t| t.vfd_enable).count() as u8;
}

/// Persist mode-level UI commands into carried state. Runs at the top of
/// the cycle so a disable takes effect before any decision is made.
pub fn persist_mode(ui: &UiCommands, state: &mut PlantState) {
    if let Some(enabled) = ui.system_enabled {
        if enabled != state.system_enabled {
            info!(enabled, "operator system enable change");
        }
        state.system_enabled = enabled;
    }
    if let Some(mode) = ui.control_mode {
        if mode != state.control_mode {
            info!(?mode, "operator control mode change");
        }
        state.control_mode = mode;
    }
}
