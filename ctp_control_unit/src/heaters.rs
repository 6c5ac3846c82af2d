//! Basin heater hysteresis.
//!
//! All three heaters switch together: on below the low threshold, off
//! above the high one, and hold their previous state inside the band.

use ctp_common::SensorMirror;

use crate::config::EngineConfig;
use crate::state::PlantState;

/// Update heater state from the outdoor temperature. Returns the enables.
pub fn control(cfg: &EngineConfig, sensors: &SensorMirror, state: &mut PlantState) -> [bool; 3] {
    let h = &cfg.heaters;
    if sensors.outdoor < h.on_below_f {
        state.heaters_on = [true; 3];
    } else if sensors.outdoor > h.off_above_f {
        state.heaters_on = [false; 3];
    }
    // Inside [on_below, off_above]: hold.
    state.heaters_on
}
