//! Telemetry line-protocol encoding.
//!
//! The reporter publishes one `metrics` measurement per interval to the
//! external time-series endpoint:
//!
//! ```text
//! metrics,site=ctp-01 tower1_fan_speed_v=2.6,...,alarm_status="normal" 1690000000000000000
//! ```
//!
//! The encoder is pure; the push itself belongs to the reporter task in
//! the supervisor. Field names are part of the external contract; renaming
//! one breaks downstream dashboards.

use std::fmt::Write as _;

use crate::fault::SeverityZone;
use crate::points::OutputSnapshot;

/// Measurement name used for every plant record.
pub const MEASUREMENT: &str = "metrics";

/// Escape a tag value per line-protocol rules (commas, equals, spaces).
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Format a float field without trailing noise for integral values.
fn fmt_f64(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Encode one output snapshot as a line-protocol record.
///
/// `site` becomes the `site` tag (normally the service name from
/// [`crate::config::SharedConfig`]).
pub fn encode_line(site: &str, out: &OutputSnapshot) -> String {
    let mut line = String::with_capacity(640);
    let _ = write!(line, "{MEASUREMENT},site={}", escape_tag(site));
    line.push(' ');

    let s = &out.sensors;
    let mut first = true;
    let mut field = |line: &mut String, name: &str, value: String| {
        if !first {
            line.push(',');
        }
        first = false;
        let _ = write!(line, "{name}={value}");
    };

    for (i, tower) in out.towers.iter().enumerate() {
        let n = i + 1;
        field(&mut line, &format!("tower{n}_vfd_enable"), tower.vfd_enable.to_string());
        field(&mut line, &format!("tower{n}_fan_speed_v"), fmt_f64(tower.fan_speed));
        field(&mut line, &format!("tower{n}_heater"), tower.heater_enable.to_string());
        field(&mut line, &format!("tower{n}_current_a"), fmt_f64(s.vfd_current[i][0]));
        field(&mut line, &format!("tower{n}_current_b"), fmt_f64(s.vfd_current[i][1]));
        field(&mut line, &format!("tower{n}_vibration_mm_s"), fmt_f64(s.vibration[i]));
        field(
            &mut line,
            &format!("tower{n}_vibration_zone"),
            format!("\"{}\"", out.vibration_zones[i].as_str()),
        );
    }

    for i in 0..3 {
        let n = i + 1;
        field(&mut line, &format!("pump{n}_enable"), out.pumps[i].to_string());
        field(&mut line, &format!("pump{n}_current_a"), fmt_f64(s.pump_current[i]));
        field(
            &mut line,
            &format!("pump{n}_runtime_h"),
            fmt_f64(out.pump_runtime_hours[i]),
        );
    }

    field(&mut line, "tower_supply_f", fmt_f64(s.tower_supply));
    field(&mut line, "tower_return_f", fmt_f64(s.tower_return));
    field(&mut line, "hp_supply_f", fmt_f64(s.hp_supply));
    field(&mut line, "hp_return_f", fmt_f64(s.hp_return));
    field(&mut line, "outdoor_f", fmt_f64(s.outdoor));
    field(&mut line, "setpoint_f", fmt_f64(s.setpoint));
    field(&mut line, "tower_range_f", fmt_f64(s.tower_range()));
    field(&mut line, "loop_delta_t_f", fmt_f64(out.loop_delta_t));
    field(&mut line, "cooling_demand_pct", fmt_f64(out.cooling_demand));
    field(&mut line, "lead_tower", out.lead_tower.number().to_string());
    field(&mut line, "active_towers", out.active_towers.to_string());
    field(
        &mut line,
        "bypass_valve_v",
        fmt_f64(out.bypass_valve_position),
    );
    field(
        &mut line,
        "tempering_valve_v",
        fmt_f64(out.tempering_valve_position),
    );
    field(
        &mut line,
        "alarm_status",
        format!("\"{}\"", out.alarm_status.as_str()),
    );

    let _ = write!(line, " {}", out.stamp.as_nanos());
    line
}

/// Worst vibration zone across all towers. Reporter convenience.
pub fn worst_zone(zones: &[SeverityZone; 3]) -> SeverityZone {
    let mut worst = SeverityZone::A;
    for z in zones {
        if (*z as u8) > (worst as u8) {
            worst = *z;
        }
    }
    worst
}
