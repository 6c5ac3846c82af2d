//! # CTP Common Library
//!
//! Shared vocabulary for the CTP cooling tower plant control system.
//! Defines the data that crosses module boundaries: raw sensor snapshots,
//! UI commands, the output command snapshot, fault codes, safety bypasses,
//! timestamps, the plant I/O driver contract, the shared configuration
//! loader, and the telemetry line-protocol encoder.
//!
//! Everything in this crate is plain data plus small pure helpers: no I/O
//! and no control decisions. The control engine lives in `ctp_control_unit`.

pub mod config;
pub mod fault;
pub mod ids;
pub mod io;
pub mod points;
pub mod telemetry;
pub mod time;

pub use fault::{AlarmStatus, FaultCode, SafetyBypasses, SeverityZone};
pub use ids::{PumpId, TowerId};
pub use points::{
    ChannelMap, ControlMode, OutputSnapshot, RawSnapshot, SensorMirror, TowerOutput, UiCommands,
    ValveCmd,
};
pub use time::Stamp;
