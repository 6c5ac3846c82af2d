//! Equipment identifiers.
//!
//! Towers and pumps are addressed by small enums rather than string keys;
//! every per-unit table in the system is a fixed `[T; 3]` indexed through
//! [`TowerId::index`] / [`PumpId::index`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three cooling towers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TowerId {
    #[default]
    T1,
    T2,
    T3,
}

impl TowerId {
    /// All towers, in plant order.
    pub const ALL: [TowerId; 3] = [TowerId::T1, TowerId::T2, TowerId::T3];

    /// Zero-based array index.
    pub const fn index(self) -> usize {
        match self {
            TowerId::T1 => 0,
            TowerId::T2 => 1,
            TowerId::T3 => 2,
        }
    }

    /// One-based plant number, as used in fault codes and telemetry tags.
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// The next tower in rotation order (wraps T3 → T1).
    pub const fn next(self) -> TowerId {
        match self {
            TowerId::T1 => TowerId::T2,
            TowerId::T2 => TowerId::T3,
            TowerId::T3 => TowerId::T1,
        }
    }

    /// Construct from a zero-based index.
    pub const fn from_index(i: usize) -> Option<TowerId> {
        match i {
            0 => Some(TowerId::T1),
            1 => Some(TowerId::T2),
            2 => Some(TowerId::T3),
            _ => None,
        }
    }
}

impl fmt::Display for TowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One of the three circulation pumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PumpId {
    P1,
    P2,
    P3,
}

impl PumpId {
    /// All pumps, in plant order.
    pub const ALL: [PumpId; 3] = [PumpId::P1, PumpId::P2, PumpId::P3];

    /// Zero-based array index.
    pub const fn index(self) -> usize {
        match self {
            PumpId::P1 => 0,
            PumpId::P2 => 1,
            PumpId::P3 => 2,
        }
    }

    /// One-based plant number.
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// The next pump in rotation order (wraps P3 → P1).
    pub const fn next(self) -> PumpId {
        match self {
            PumpId::P1 => PumpId::P2,
            PumpId::P2 => PumpId::P3,
            PumpId::P3 => PumpId::P1,
        }
    }
}

impl fmt::Display for PumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}
