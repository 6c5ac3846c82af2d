//! Lead rotation and the staging decision.
//!
//! Staging converts the loop error ΔT (HP supply − setpoint) into a
//! demanded tower count plus a cooling-demand percentage, evaluated
//! top-down with first match winning:
//!
//! 1. Hard shutdown (deep negative ΔT or a hard temperature floor).
//! 2. Continuation: any tower already running and ΔT has not collapsed
//!    keeps at least the running set on, demand tracking ΔT.
//! 3. The stage table: 1/2/3 towers at rising ΔT thresholds.
//!
//! The continuation branch demands `max(stage_table, running_count)` and
//! the activation order puts running towers ahead of fresh starts, so a
//! tower inside its minimum runtime is never commanded off by a staging
//! wobble.

use tracing::{debug, info};

use ctp_common::{SensorMirror, Stamp, TowerId};

use crate::config::EngineConfig;
use crate::state::PlantState;

// ─── Lead Rotation ──────────────────────────────────────────────────

/// Advance the lead tower on the weekly boundary, skipping unavailable
/// towers. Also repairs an unavailable lead immediately, since the lead must
/// reference an available tower whenever one exists.
pub fn rotate_lead(cfg: &EngineConfig, state: &mut PlantState, now: Stamp) {
    let available = |t: TowerId| cfg.equipment.tower_available[t.index()];

    let period_elapsed =
        now.secs_since(state.lead_rotation_start) >= cfg.staging.lead_rotation_period_s as f64;
    if !period_elapsed && available(state.lead_tower) {
        return;
    }

    let mut candidate = state.lead_tower.next();
    for _ in 0..3 {
        if available(candidate) {
            if candidate != state.lead_tower {
                info!(
                    from = %state.lead_tower,
                    to = %candidate,
                    "lead tower rotation"
                );
            }
            state.lead_tower = candidate;
            state.lead_rotation_start = now;
            return;
        }
        candidate = candidate.next();
    }
    // No available tower; leave the lead unchanged.
}

// ─── Staging Decision ───────────────────────────────────────────────

/// Result of the staging decision for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagingDecision {
    /// Towers that should be active this cycle.
    pub demanded: usize,
    /// Cooling demand [%].
    pub demand_pct: f64,
    /// HP supply minus setpoint [°F].
    pub delta_t: f64,
    /// Activation order: running towers first, then lead-first.
    pub order: [TowerId; 3],
    /// A hard cold-shutdown condition holds this cycle.
    pub hard_shutdown: bool,
}

/// The plain stage table (no continuation bias).
fn stage_table(cfg: &EngineConfig, delta_t: f64) -> (usize, f64) {
    let s = &cfg.staging;
    if delta_t >= s.stage4_delta {
        (3, 100.0)
    } else if delta_t >= s.stage3_delta {
        (3, 75.0)
    } else if delta_t >= s.stage2_delta {
        (2, 60.0)
    } else if delta_t >= s.stage1_delta {
        let pct = (28.0 + 2.0 * (delta_t - s.stage1_delta)).clamp(28.0, 50.0);
        (1, pct)
    } else {
        (0, 0.0)
    }
}

/// Compute the staging decision from sanitized sensors and carried state.
pub fn decide(cfg: &EngineConfig, sensors: &SensorMirror, state: &PlantState) -> StagingDecision {
    let s = &cfg.staging;
    let delta_t = sensors.hp_supply - sensors.setpoint;

    let hard_shutdown = delta_t < s.cold_shutdown_delta
        || sensors.hp_supply < s.hp_supply_min
        || sensors.tower_supply < s.tower_supply_min;

    let running = state.running_count();
    let (demanded, demand_pct) = if hard_shutdown {
        (0, 0.0)
    } else if running > 0 && delta_t >= s.continuation_delta {
        let (table_demand, _) = stage_table(cfg, delta_t);
        let pct = (28.0 + 3.0 * delta_t).clamp(28.0, 100.0);
        (table_demand.max(running).max(1), pct)
    } else {
        stage_table(cfg, delta_t)
    };

    let order = activation_order(state);

    debug!(
        delta_t,
        demanded, demand_pct, hard_shutdown, "staging decision"
    );

    StagingDecision {
        demanded,
        demand_pct,
        delta_t,
        order,
        hard_shutdown,
    }
}

/// Lead-first sequence with currently-running towers moved to the front
/// (stable within each group).
fn activation_order(state: &PlantState) -> [TowerId; 3] {
    let lead_seq = [
        state.lead_tower,
        state.lead_tower.next(),
        state.lead_tower.next().next(),
    ];
    let mut order = [state.lead_tower; 3];
    let mut n = 0;
    for t in lead_seq.iter().filter(|t| state.run(**t).is_running()) {
        order[n] = *t;
        n += 1;
    }
    for t in lead_seq.iter().filter(|t| !state.run(**t).is_running()) {
        order[n] = *t;
        n += 1;
    }
    order
}
