//! Plant timestamps.
//!
//! The engine is a pure transform: the caller samples the clock once per
//! cycle and threads the resulting [`Stamp`] through every decision. All
//! interval arithmetic saturates, so a caller handing in a stale or
//! rewound clock can never underflow a timer.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Millisecond-resolution wall timestamp carried through a control cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Stamp(u64);

impl Stamp {
    /// The zero timestamp, used as "never set" in carried state.
    pub const ZERO: Stamp = Stamp(0);

    /// Construct from milliseconds since the Unix epoch.
    pub const fn from_millis(ms: u64) -> Self {
        Stamp(ms)
    }

    /// Construct from whole seconds since the Unix epoch.
    pub const fn from_secs(s: u64) -> Self {
        Stamp(s * 1000)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Nanoseconds since the Unix epoch (for line-protocol timestamps).
    pub const fn as_nanos(self) -> u128 {
        self.0 as u128 * 1_000_000
    }

    /// True when this stamp has never been written.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sample the system clock. Only the runner calls this; the engine
    /// itself receives the stamp as an argument.
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Stamp(ms)
    }

    /// Saturating interval since `earlier`.
    pub fn since(self, earlier: Stamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Saturating interval since `earlier`, in fractional seconds.
    pub fn secs_since(self, earlier: Stamp) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 / 1000.0
    }

    /// This stamp advanced by `d`.
    pub fn plus(self, d: Duration) -> Stamp {
        Stamp(self.0.saturating_add(d.as_millis() as u64))
    }
}
