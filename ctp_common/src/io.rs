//! Plant I/O driver contract.
//!
//! The engine never touches hardware. A [`PlantIo`] implementation owns
//! the acquisition and actuation side: analog HAT, relay board, RS-485
//! vibration bus, weather feed, triacs, and analog outputs. The supervisor
//! calls `read` once per cycle, hands the snapshot to the engine, and
//! applies the resulting output snapshot through the same driver.
//!
//! Hardware backends live out of tree; this crate ships only the contract.
//! A deterministic simulation backend lives in `ctp_supervisor` for
//! dry runs and examples.

use thiserror::Error;

use crate::points::{OutputSnapshot, RawSnapshot};

/// Error type for plant I/O operations.
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Acquisition failed (bus fault, device absent, short read).
    #[error("acquisition error: {0}")]
    Read(String),

    /// Actuation failed (relay/analog write rejected).
    #[error("actuation error: {0}")]
    Apply(String),

    /// The driver lost its device and cannot continue.
    #[error("I/O backend disconnected: {0}")]
    Disconnected(String),
}

/// Interface for pluggable plant I/O backends.
///
/// # Lifecycle
///
/// 1. `init()`: once, before the first cycle; may block on device setup.
/// 2. `read()` / `apply()`: every cycle, in that order.
/// 3. `shutdown()`: once, on supervisor exit; must leave outputs safe.
pub trait PlantIo: Send {
    /// Backend identifier (e.g. `"sim"`, `"fieldbus"`).
    fn name(&self) -> &'static str;

    /// Prepare the backend. Called once before the first cycle.
    fn init(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    /// Acquire one raw snapshot of every input channel.
    fn read(&mut self) -> Result<RawSnapshot, IoError>;

    /// Drive every physical output from the snapshot.
    fn apply(&mut self, output: &OutputSnapshot) -> Result<(), IoError>;

    /// Release the backend, leaving all outputs in their de-energized state.
    fn shutdown(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
