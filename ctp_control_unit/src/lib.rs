//! # CTP Control Unit Library
//!
//! Supervisory control engine for a three-tower evaporative cooling plant
//! serving a heat-pump loop. Each cycle the engine ingests a raw sensor
//! snapshot, optional UI commands, and the carried plant state, and
//! produces a complete output command snapshot: tower fans, isolation
//! valves, circulation pumps, tempering/bypass valves, and basin heaters.
//!
//! ## Cycle pipeline
//!
//! [`engine::step`] runs the sub-components in a fixed order that is part
//! of the contract:
//!
//! 1. State priming (seed zero timestamps on first cycle)
//! 2. Sensor sanitizing (parse, bounds, last-known-good)
//! 3. Safety gate (critical faults short-circuit to safe shutdown)
//! 4. Lead-tower rotation (weekly)
//! 5. Staging decision (ΔT table with running-tower continuation)
//! 6. Pump supervision (rotation, failover, overlap changeover)
//! 7. Tower commanding (cooldown gate, PID fan speed, VFD ramping)
//! 8. Runtime enforcement (minimum-run hold, off-cooldown stamping)
//! 9. Valve control (freeze-protection tempering below 42 °F)
//! 10. Heater hysteresis
//! 11. Monitoring pass (warnings, speed clamps)
//! 12. Manual override merge
//!
//! ## Determinism
//!
//! The engine performs no I/O, never blocks, and never samples the clock;
//! the caller passes `now` in. Given equal inputs and state it produces
//! bit-equal outputs, which the scenario tests rely on.

pub mod config;
pub mod engine;
pub mod heaters;
pub mod merge;
pub mod monitor;
pub mod pid;
pub mod pumps;
pub mod safety;
pub mod sanitize;
pub mod staging;
pub mod state;
pub mod towers;
pub mod valves;

pub use config::EngineConfig;
pub use engine::step;
pub use state::PlantState;
