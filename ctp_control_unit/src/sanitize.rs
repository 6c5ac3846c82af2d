//! Sensor sanitizing: parse, bounds-check, last-known-good substitution.
//!
//! The acquisition side hands over raw strings in engineering units. This
//! pass owns every conversion so the rest of the engine only ever sees
//! finite numbers:
//!
//! - Loop temperatures outside the plausibility window are replaced by the
//!   last accepted value; the replacement is silent (telemetry exposes the
//!   frozen value, which is the alerting signal).
//! - The outdoor temperature gets the same treatment with its wider window.
//! - Currents and vibrations are taken as-is; an unparsable reading
//!   becomes 0.0, so protective comparisons only ever act on affirmative
//!   readings.

use tracing::debug;

use ctp_common::{RawSnapshot, SensorMirror};

use crate::config::EngineConfig;
use crate::state::LastGoodTemps;

/// Parse one channel to a finite number.
fn parse(raw: &RawSnapshot, channel: &str) -> Option<f64> {
    let value: f64 = raw.get(channel)?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Validate a temperature against a window, falling back to (and
/// refreshing) the last accepted value.
fn accept_temp(
    raw: &RawSnapshot,
    channel: &str,
    window: (f64, f64),
    last_good: &mut f64,
) -> f64 {
    match parse(raw, channel) {
        Some(v) if v >= window.0 && v <= window.1 => {
            *last_good = v;
            v
        }
        got => {
            debug!(
                channel,
                ?got,
                substitute = *last_good,
                "temperature rejected, holding last good value"
            );
            *last_good
        }
    }
}

/// Sanitize one raw snapshot into engineering values.
///
/// `last_good` is refreshed with every accepted temperature and is the
/// substitution source for rejected ones.
pub fn sanitize(cfg: &EngineConfig, raw: &RawSnapshot, last_good: &mut LastGoodTemps) -> SensorMirror {
    let ch = &cfg.channels;
    let sz = &cfg.sanitize;
    let loop_window = (sz.loop_min_f, sz.loop_max_f);

    let tower_supply = accept_temp(raw, &ch.tower_supply, loop_window, &mut last_good.tower_supply);
    let tower_return = accept_temp(raw, &ch.tower_return, loop_window, &mut last_good.tower_return);
    let hp_return = accept_temp(raw, &ch.hp_return, loop_window, &mut last_good.hp_return);
    let hp_supply = accept_temp(raw, &ch.hp_supply, loop_window, &mut last_good.hp_supply);
    let outdoor = accept_temp(
        raw,
        &ch.outdoor,
        (sz.outdoor_min_f, sz.outdoor_max_f),
        &mut last_good.outdoor,
    );

    let setpoint = parse(raw, &ch.setpoint).unwrap_or(sz.default_setpoint_f);

    let mut vfd_current = [[0.0; 2]; 3];
    for (i, legs) in ch.vfd_current.iter().enumerate() {
        for (j, channel) in legs.iter().enumerate() {
            vfd_current[i][j] = parse(raw, channel).unwrap_or(0.0);
        }
    }

    let mut pump_current = [0.0; 3];
    for (i, channel) in ch.pump_current.iter().enumerate() {
        pump_current[i] = parse(raw, channel).unwrap_or(0.0);
    }

    let mut vibration = [0.0; 3];
    for (i, channel) in ch.vibration.iter().enumerate() {
        vibration[i] = parse(raw, channel).unwrap_or(0.0);
    }

    SensorMirror {
        tower_supply,
        tower_return,
        hp_return,
        hp_supply,
        outdoor,
        setpoint,
        vfd_current,
        pump_current,
        vibration,
    }
}
