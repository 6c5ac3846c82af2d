//! Positional PID controller with clamped output and integral cap.
//!
//! Both modulation loops (tower fans, tempering valve) share this
//! implementation. The interface is deliberately fallible: callers own a
//! documented fallback and must never let a rejected sample propagate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning and limits for one PID loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Output saturation floor.
    pub out_min: f64,
    /// Output saturation ceiling.
    pub out_max: f64,
    /// Invert the error sign (output rises when input exceeds setpoint).
    pub reverse_acting: bool,
    /// Absolute cap on the integral accumulator.
    pub max_integral: f64,
}

/// Controller memory carried across cycles.
///
/// `last_output` doubles as the slew/fallback anchor: the valve controller
/// overwrites it with the final commanded position after slew limiting, and
/// the fan fallback nudges it by fixed steps when the PID rejects a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidMemory {
    /// Integral accumulator.
    pub integral: f64,
    /// Previous cycle's error (for the derivative term).
    pub previous_error: f64,
    /// Previous cycle's final output.
    pub last_output: f64,
}

impl PidMemory {
    /// Memory seeded at a given output anchor.
    pub fn at_output(output: f64) -> Self {
        PidMemory {
            last_output: output,
            ..PidMemory::default()
        }
    }

    /// Zero the accumulator and error history, keeping the output anchor.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
    }
}

/// Decomposed result of one PID sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidTerms {
    /// Clamped output.
    pub output: f64,
    /// Proportional contribution.
    pub p: f64,
    /// Integral contribution.
    pub i: f64,
    /// Derivative contribution.
    pub d: f64,
    /// Signed error used this sample.
    pub error: f64,
}

/// Reasons a PID sample can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PidError {
    /// Input or setpoint was NaN/infinite.
    #[error("non-finite PID sample: input={input}, setpoint={setpoint}")]
    NonFinite { input: f64, setpoint: f64 },

    /// Sample period must be positive.
    #[error("non-positive PID dt: {0}")]
    InvalidDt(f64),
}

/// Compute one PID sample.
///
/// The integral accumulates `error * dt` and is capped at
/// `±max_integral`; the output is clamped to `[out_min, out_max]` and
/// written back to `mem.last_output`.
pub fn pid_step(
    mem: &mut PidMemory,
    params: &PidParams,
    input: f64,
    setpoint: f64,
    dt: f64,
) -> Result<PidTerms, PidError> {
    if !input.is_finite() || !setpoint.is_finite() {
        return Err(PidError::NonFinite { input, setpoint });
    }
    if dt <= 0.0 || !dt.is_finite() {
        return Err(PidError::InvalidDt(dt));
    }

    let mut error = setpoint - input;
    if params.reverse_acting {
        error = -error;
    }

    mem.integral = (mem.integral + error * dt).clamp(-params.max_integral, params.max_integral);

    let p = params.kp * error;
    let i = params.ki * mem.integral;
    let d = params.kd * (error - mem.previous_error) / dt;
    mem.previous_error = error;

    let output = (p + i + d).clamp(params.out_min, params.out_max);
    mem.last_output = output;

    Ok(PidTerms {
        output,
        p,
        i,
        d,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valve_params() -> PidParams {
        PidParams {
            kp: 2.5,
            ki: 0.15,
            kd: 0.05,
            out_min: 2.0,
            out_max: 10.0,
            reverse_acting: false,
            max_integral: 50.0,
        }
    }

    #[test]
    fn direct_acting_rises_when_input_below_setpoint() {
        let mut mem = PidMemory::default();
        let t = pid_step(&mut mem, &valve_params(), 40.0, 45.0, 7.0).unwrap();
        assert!(t.error > 0.0);
        assert!(t.output > 2.0);
    }

    #[test]
    fn reverse_acting_inverts_error() {
        let mut mem = PidMemory::default();
        let params = PidParams {
            reverse_acting: true,
            out_min: 2.6,
            out_max: 4.8,
            kp: 0.12,
            ki: 0.03,
            kd: 0.0,
            max_integral: 50.0,
        };
        // Input hotter than setpoint → positive (inverted) error → output up.
        let t = pid_step(&mut mem, &params, 90.0, 75.0, 15.0).unwrap();
        assert!(t.error > 0.0);
        assert!(t.output > 2.6);
    }

    #[test]
    fn output_clamped_to_range() {
        let mut mem = PidMemory::default();
        let t = pid_step(&mut mem, &valve_params(), -1000.0, 45.0, 7.0).unwrap();
        assert_eq!(t.output, 10.0);
        let t = pid_step(&mut mem, &valve_params(), 1000.0, 45.0, 7.0).unwrap();
        assert_eq!(t.output, 2.0);
    }

    #[test]
    fn integral_capped() {
        let mut mem = PidMemory::default();
        for _ in 0..1000 {
            pid_step(&mut mem, &valve_params(), 0.0, 45.0, 7.0).unwrap();
        }
        assert!(mem.integral <= 50.0 + 1e-12);
    }

    #[test]
    fn derivative_uses_error_delta() {
        let params = PidParams {
            kp: 0.0,
            ki: 0.0,
            kd: 1.0,
            out_min: -100.0,
            out_max: 100.0,
            reverse_acting: false,
            max_integral: 50.0,
        };
        let mut mem = PidMemory::default();
        pid_step(&mut mem, &params, 45.0, 45.0, 1.0).unwrap();
        let t = pid_step(&mut mem, &params, 44.0, 45.0, 1.0).unwrap();
        // Error moved 0 → 1 over dt=1 → d = 1.
        assert!((t.d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_nan_input() {
        let mut mem = PidMemory::default();
        let err = pid_step(&mut mem, &valve_params(), f64::NAN, 45.0, 7.0).unwrap_err();
        assert!(matches!(err, PidError::NonFinite { .. }));
        // Memory untouched on rejection.
        assert_eq!(mem, PidMemory::default());
    }

    #[test]
    fn rejects_bad_dt() {
        let mut mem = PidMemory::default();
        assert!(matches!(
            pid_step(&mut mem, &valve_params(), 44.0, 45.0, 0.0),
            Err(PidError::InvalidDt(_))
        ));
        assert!(matches!(
            pid_step(&mut mem, &valve_params(), 44.0, 45.0, -7.0),
            Err(PidError::InvalidDt(_))
        ));
    }

    #[test]
    fn last_output_tracks_final_value() {
        let mut mem = PidMemory::default();
        let t = pid_step(&mut mem, &valve_params(), 40.0, 45.0, 7.0).unwrap();
        assert_eq!(mem.last_output, t.output);
    }

    #[test]
    fn reset_keeps_anchor() {
        let mut mem = PidMemory::at_output(6.0);
        pid_step(&mut mem, &valve_params(), 40.0, 45.0, 7.0).unwrap();
        let anchor = mem.last_output;
        mem.reset();
        assert_eq!(mem.integral, 0.0);
        assert_eq!(mem.previous_error, 0.0);
        assert_eq!(mem.last_output, anchor);
    }
}
