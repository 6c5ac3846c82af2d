//! Circulation pump supervision.
//!
//! Exactly one duty pump runs at a time; a changeover (weekly rotation or
//! current-loss failover) briefly overlaps the outgoing and incoming
//! pumps so loop circulation never drops. Failover detection is debounced
//! so a slow soft-starter cannot trigger a cascade.

use tracing::{info, warn};

use ctp_common::{PumpId, SafetyBypasses, SensorMirror, Stamp};

use crate::config::EngineConfig;
use crate::state::{Changeover, PumpState};

/// Find the next available pump after `from`, or `None` when no other
/// pump can take over.
fn next_available(cfg: &EngineConfig, from: PumpId) -> Option<PumpId> {
    let mut candidate = from.next();
    for _ in 0..2 {
        if cfg.equipment.pump_available[candidate.index()] {
            return Some(candidate);
        }
        candidate = candidate.next();
    }
    None
}

/// Run one supervision cycle. Returns the per-pump enables.
pub fn supervise(
    cfg: &EngineConfig,
    now: Stamp,
    sensors: &SensorMirror,
    state: &mut PumpState,
) -> [bool; 3] {
    let p = &cfg.pumps;

    // ── Failure detection ──
    let monitored = state.changeover.is_none()
        && !cfg.bypasses.contains(SafetyBypasses::PUMP_STATUS);
    if monitored {
        let active_current = sensors.pump_current[state.active.index()];
        let debounced = state
            .last_failover
            .map_or(true, |t| now.secs_since(t) > p.failure_debounce_s as f64);
        if active_current < p.failure_current_a && debounced {
            if let Some(next) = next_available(cfg, state.active) {
                warn!(
                    failed = %state.active,
                    takeover = %next,
                    current_a = active_current,
                    "pump current loss, scheduling failover"
                );
                state.changeover = Some(Changeover { next, since: now });
                state.failover_count += 1;
                state.last_failover = Some(now);
            }
        }
    }

    // ── Weekly rotation ──
    if state.changeover.is_none()
        && now.secs_since(state.rotation_start) >= p.rotation_period_s as f64
    {
        if let Some(next) = next_available(cfg, state.active) {
            info!(from = %state.active, to = %next, "pump rotation");
            state.changeover = Some(Changeover { next, since: now });
        }
        state.rotation_start = now;
    }

    // ── Changeover execution ──
    // Both pumps stay asserted through the tick that completes the
    // changeover; the outgoing pump drops out on the following cycle.
    let mut enables = [false; 3];
    if let Some(c) = state.changeover {
        enables[state.active.index()] = true;
        enables[c.next.index()] = true;
        if now.secs_since(c.since) >= p.changeover_overlap_s as f64 {
            info!(from = %state.active, to = %c.next, "pump changeover complete");
            state.active = c.next;
            state.changeover = None;
        }
    } else {
        enables[state.active.index()] = true;
    }

    // ── Runtime accounting ──
    state.runtime_hours[state.active.index()] += cfg.tick_s / 3600.0;

    enables
}
