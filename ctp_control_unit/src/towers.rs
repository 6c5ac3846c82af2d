//! Tower commanding: activation, fan modulation, and runtime enforcement.
//!
//! The commander walks the staging order and activates up to the demanded
//! count, gated by availability and the off cooldown. Fan speed goes
//! through a fixed pipeline: startup floor → maintain band → PID →
//! ramp filter → sub-minimum coercion.
//!
//! The runtime enforcer runs after the commander and owns every tower the
//! commander left off: it holds towers inside their minimum runtime on,
//! stamps the off cooldown when a stop is permitted, and gives a released
//! tower one final forced-on cycle so demand wobble near the setpoint
//! cannot short-cycle a fan.

use tracing::{debug, warn};

use ctp_common::{SensorMirror, Stamp, TowerId, ValveCmd};

use crate::config::EngineConfig;
use crate::pid::{pid_step, PidMemory};
use crate::staging::StagingDecision;
use crate::state::{PlantState, RampState, TowerRun};

// ─── Tower Plan ─────────────────────────────────────────────────────

/// Raw per-tower commands before monitoring and manual merge.
#[derive(Debug, Clone, PartialEq)]
pub struct TowerPlan {
    /// Fan VFD enables.
    pub enable: [bool; 3],
    /// Fan speed commands [V].
    pub speed: [f64; 3],
    /// Isolation valve commands.
    pub valve: [ValveCmd; 3],
    /// Towers skipped by the commander because their off cooldown has not
    /// elapsed.
    pub blocked: Vec<TowerId>,
}

impl TowerPlan {
    fn all_off() -> Self {
        TowerPlan {
            enable: [false; 3],
            speed: [0.0; 3],
            valve: [ValveCmd::Close; 3],
            blocked: Vec::new(),
        }
    }
}

// ─── Commander ──────────────────────────────────────────────────────

/// Activate towers per the staging decision.
pub fn command(
    cfg: &EngineConfig,
    now: Stamp,
    sensors: &SensorMirror,
    staging: &StagingDecision,
    state: &mut PlantState,
) -> TowerPlan {
    let mut plan = TowerPlan::all_off();

    let mut activated = 0;
    for t in staging.order {
        if activated == staging.demanded {
            break;
        }
        let i = t.index();

        if !cfg.equipment.tower_available[i] {
            continue;
        }

        if let TowerRun::OffCooldown { since } = state.run(t) {
            if now.secs_since(since) < cfg.protection.min_off_s as f64 {
                debug!(tower = %t, "start blocked by off cooldown");
                plan.blocked.push(t);
                continue;
            }
        }

        if !state.run(t).is_running() {
            state.tower_run[i] = TowerRun::Running { since: now };
            state.ramp[i] = Some(RampState::at(cfg.fan.v_min, now));
            state.fan_pid[i] = PidMemory::at_output(cfg.fan.v_min);
            debug!(tower = %t, "tower start");
        }

        let (speed, coerced_off) = fan_speed(cfg, now, t, sensors, staging.demand_pct, state);
        if coerced_off {
            plan.enable[i] = false;
            plan.speed[i] = 0.0;
            plan.valve[i] = ValveCmd::Close;
        } else {
            plan.enable[i] = true;
            plan.speed[i] = speed;
            plan.valve[i] = ValveCmd::Open;
        }
        activated += 1;
    }

    plan
}

// ─── Fan Speed Pipeline ─────────────────────────────────────────────

/// Compute the commanded fan voltage for a running tower.
///
/// Returns `(speed, coerced_off)`; `coerced_off` means the post-ramp value
/// fell into the dead band below `v_min` after the startup window, so the
/// drive must be disabled instead of driven below its minimum.
fn fan_speed(
    cfg: &EngineConfig,
    now: Stamp,
    tower: TowerId,
    sensors: &SensorMirror,
    demand_pct: f64,
    state: &mut PlantState,
) -> (f64, bool) {
    let f = &cfg.fan;
    let i = tower.index();
    let since = match state.run(tower) {
        TowerRun::Running { since } => since,
        // Not running: the commander never asks for a speed in this case.
        _ => now,
    };
    let t_run = now.secs_since(since);
    let in_startup = t_run < cfg.protection.min_runtime_s as f64;

    // ── Target selection ──
    let target = if in_startup {
        f.v_min
    } else if (sensors.hp_supply - sensors.setpoint).abs() < f.maintain_band_f {
        f.v_min
    } else {
        match pid_step(
            &mut state.fan_pid[i],
            &f.pid,
            sensors.hp_supply,
            sensors.setpoint,
            f.pid_dt_s,
        ) {
            Ok(terms) => terms.output,
            Err(e) => {
                warn!(tower = %tower, error = %e, "fan PID rejected sample, using step fallback");
                let mem = &mut state.fan_pid[i];
                if demand_pct > f.fallback_up_pct {
                    mem.last_output = (mem.last_output + f.fallback_step_v).min(f.v_max);
                } else if demand_pct < f.fallback_down_pct {
                    mem.last_output = (mem.last_output - f.fallback_step_v).max(f.v_min);
                }
                mem.last_output
            }
        }
    };

    // ── Ramp filter ──
    let ramp = state.ramp[i].get_or_insert(RampState::at(f.v_min, now));
    ramp.target_v = target;
    if (target - ramp.current_v).abs() > f64::EPSILON {
        let delay_s = if target > ramp.current_v {
            f.ramp_up_delay_s
        } else {
            f.ramp_down_delay_s
        };
        if now.secs_since(ramp.last_change) >= delay_s as f64 {
            let step = (target - ramp.current_v).clamp(-f.ramp_step_v, f.ramp_step_v);
            ramp.current_v += step;
            ramp.last_change = now;
        }
    }

    // ── Sub-minimum coercion ──
    let speed = ramp.current_v.min(f.v_max);
    if speed < f.v_min {
        if in_startup {
            (f.v_min, false)
        } else {
            (0.0, true)
        }
    } else {
        (speed, false)
    }
}

// ─── Runtime Enforcer ───────────────────────────────────────────────

/// Enforce minimum runtimes and stamp off cooldowns.
///
/// Owns every tower that is `Running` in state but off in the plan.
pub fn enforce_runtime(
    cfg: &EngineConfig,
    now: Stamp,
    sensors: &SensorMirror,
    staging: &StagingDecision,
    plan: &mut TowerPlan,
    state: &mut PlantState,
) {
    for t in TowerId::ALL {
        let i = t.index();
        let since = match state.run(t) {
            TowerRun::Running { since } => since,
            _ => continue,
        };
        if plan.enable[i] {
            continue;
        }

        let t_run = now.secs_since(since);
        let stop = |state: &mut PlantState, plan: &mut TowerPlan| {
            state.tower_run[i] = TowerRun::OffCooldown { since: now };
            state.ramp[i] = None;
            plan.enable[i] = false;
            plan.speed[i] = 0.0;
            plan.valve[i] = ValveCmd::Close;
        };

        if staging.hard_shutdown || !cfg.equipment.tower_available[i] {
            // Hard cold-shutdown (or a tower pulled from service) overrides
            // the minimum-runtime hold.
            debug!(tower = %t, t_run, "tower stop: hard shutdown");
            stop(state, plan);
        } else if t_run < cfg.protection.min_runtime_s as f64 {
            // Inside minimum runtime: hold the tower on.
            debug!(tower = %t, t_run, "minimum runtime hold");
            plan.enable[i] = true;
            plan.speed[i] = cfg.fan.v_min;
            plan.valve[i] = ValveCmd::Open;
            if let Some(ramp) = state.ramp[i].as_mut() {
                ramp.current_v = cfg.fan.v_min;
                ramp.target_v = cfg.fan.v_min;
            }
        } else if staging.delta_t < cfg.staging.release_delta
            || sensors.hp_supply < cfg.staging.hp_supply_min
        {
            // Demand has genuinely collapsed: release and start the cooldown.
            debug!(tower = %t, t_run, "tower stop: cooldown started");
            stop(state, plan);
        } else {
            // Minimum met but conditions still warrant cooling: release the
            // timer and keep the fan on for this cycle so the engine does
            // not oscillate around the setpoint.
            debug!(tower = %t, t_run, "runtime released, holding one cycle");
            state.tower_run[i] = TowerRun::Idle;
            state.ramp[i] = None;
            plan.enable[i] = true;
            plan.speed[i] = cfg.fan.v_min;
            plan.valve[i] = ValveCmd::Open;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::decide;

    fn sensors(hp_supply: f64, setpoint: f64) -> SensorMirror {
        SensorMirror {
            hp_supply,
            setpoint,
            tower_supply: 75.0,
            tower_return: 85.0,
            hp_return: 85.0,
            outdoor: 80.0,
            ..SensorMirror::default()
        }
    }

    fn plan_for(
        cfg: &EngineConfig,
        now: Stamp,
        s: &SensorMirror,
        state: &mut PlantState,
    ) -> TowerPlan {
        let staging = decide(cfg, s, state);
        let mut plan = command(cfg, now, s, &staging, state);
        enforce_runtime(cfg, now, s, &staging, &mut plan, state);
        plan
    }

    #[test]
    fn first_start_runs_at_startup_floor() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        let s = sensors(90.0, 75.0); // ΔT=15 → one tower

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert_eq!(plan.enable, [true, false, false]);
        assert_eq!(plan.speed[0], 2.6);
        assert_eq!(plan.valve[0], ValveCmd::Open);
        assert_eq!(plan.valve[1], ValveCmd::Close);
        assert_eq!(
            state.run(TowerId::T1),
            TowerRun::Running { since: now }
        );
        assert!(state.ramp[0].is_some());
    }

    #[test]
    fn three_towers_on_stage_three() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        let s = sensors(105.0, 75.0); // ΔT=30

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert_eq!(plan.enable, [true, true, true]);
        assert_eq!(plan.speed, [2.6; 3]);
    }

    #[test]
    fn cooldown_blocks_restart_and_next_tower_steps_in() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        // Tower 1 stopped 60 s ago, inside the 180 s cooldown.
        state.tower_run[0] = TowerRun::OffCooldown {
            since: Stamp::from_secs(940),
        };
        let s = sensors(95.0, 75.0); // ΔT=20 → two towers

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert!(!plan.enable[0]);
        assert_eq!(plan.blocked, vec![TowerId::T1]);
        // Lag towers take the two slots.
        assert!(plan.enable[1] && plan.enable[2]);
    }

    #[test]
    fn cooldown_elapsed_allows_restart() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::OffCooldown {
            since: Stamp::from_secs(1_000 - 181),
        };
        let s = sensors(90.0, 75.0);

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert!(plan.enable[0]);
        assert!(state.run(TowerId::T1).is_running());
        assert!(plan.blocked.is_empty());
    }

    #[test]
    fn unavailable_tower_skipped() {
        let mut cfg = EngineConfig::default();
        cfg.equipment.tower_available = [false, true, true];
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        let s = sensors(90.0, 75.0); // one tower demanded

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert!(!plan.enable[0]);
        assert!(plan.enable[1]); // lag1 takes the slot
    }

    #[test]
    fn minimum_runtime_holds_tower_on_without_demand() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(880), // 120 s ago
        };
        state.ramp[0] = Some(RampState::at(2.6, Stamp::from_secs(880)));
        let s = sensors(77.0, 75.0); // ΔT=2

        // Continuation keeps the tower demanded, but even with demand
        // forced to zero the enforcer must hold it.
        let staging = StagingDecision {
            demanded: 0,
            demand_pct: 0.0,
            delta_t: 2.0,
            order: [TowerId::T1, TowerId::T2, TowerId::T3],
            hard_shutdown: false,
        };
        let mut plan = command(&cfg, now, &s, &staging, &mut state);
        enforce_runtime(&cfg, now, &s, &staging, &mut plan, &mut state);

        assert!(plan.enable[0]);
        assert_eq!(plan.speed[0], 2.6);
        assert_eq!(plan.valve[0], ValveCmd::Open);
        assert_eq!(
            state.run(TowerId::T1),
            TowerRun::Running {
                since: Stamp::from_secs(880)
            }
        );
    }

    #[test]
    fn hard_shutdown_stops_tower_after_runtime() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(500), // 500 s ago, past minimum
        };
        state.ramp[0] = Some(RampState::at(3.0, Stamp::from_secs(900)));
        let s = sensors(60.0, 75.0); // below the 65 °F hard floor

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert!(!plan.enable[0]);
        assert_eq!(plan.valve[0], ValveCmd::Close);
        assert_eq!(
            state.run(TowerId::T1),
            TowerRun::OffCooldown { since: now }
        );
        assert!(state.ramp[0].is_none());
    }

    #[test]
    fn hard_shutdown_overrides_minimum_runtime() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(940), // only 60 s in
        };
        let s = sensors(60.0, 75.0);

        let plan = plan_for(&cfg, now, &s, &mut state);
        assert!(!plan.enable[0]);
        assert_eq!(
            state.run(TowerId::T1),
            TowerRun::OffCooldown { since: now }
        );
    }

    #[test]
    fn release_with_lingering_demand_holds_one_cycle() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(500),
        };
        state.ramp[0] = Some(RampState::at(2.6, Stamp::from_secs(900)));
        let s = sensors(68.0, 75.0); // ΔT=-7: outside continuation, above release

        let plan = plan_for(&cfg, now, &s, &mut state);
        // Fan held on one more cycle, timer released without a cooldown.
        assert!(plan.enable[0]);
        assert_eq!(plan.speed[0], 2.6);
        assert_eq!(state.run(TowerId::T1), TowerRun::Idle);
    }

    #[test]
    fn ramp_steps_toward_target_with_delay() {
        let cfg = EngineConfig::default();
        let t0 = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(0), // long past startup
        };
        state.ramp[0] = Some(RampState::at(2.6, t0));
        state.fan_pid[0] = PidMemory::at_output(2.6);
        let s = sensors(95.0, 75.0); // hot loop → PID pushes up

        // Same instant: ramp delay not elapsed, speed pinned.
        let (v0, _) = fan_speed(&cfg, t0, TowerId::T1, &s, 60.0, &mut state);
        assert_eq!(v0, 2.6);

        // 15 s later: one up-step of at most 0.3 V.
        let t1 = t0.plus(std::time::Duration::from_secs(15));
        let (v1, _) = fan_speed(&cfg, t1, TowerId::T1, &s, 60.0, &mut state);
        assert!(v1 > 2.6 && v1 <= 2.6 + 0.3 + 1e-12);

        // 5 s after that: still inside the delay, speed unchanged.
        let t2 = t1.plus(std::time::Duration::from_secs(5));
        let (v2, _) = fan_speed(&cfg, t2, TowerId::T1, &s, 60.0, &mut state);
        assert_eq!(v2, v1);
    }

    #[test]
    fn ramp_down_uses_longer_delay() {
        let cfg = EngineConfig::default();
        let t0 = Stamp::from_secs(10_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(0),
        };
        state.ramp[0] = Some(RampState {
            current_v: 4.0,
            target_v: 4.0,
            last_change: t0,
        });
        // Maintain band: |ΔT| < 2 → target v_min, so the ramp walks down.
        let s = sensors(75.5, 75.0);

        // 15 s later: up-delay elapsed but this is a down-ramp (20 s).
        let t1 = t0.plus(std::time::Duration::from_secs(15));
        let (v1, _) = fan_speed(&cfg, t1, TowerId::T1, &s, 0.0, &mut state);
        assert_eq!(v1, 4.0);

        // 20 s later: one down-step.
        let t2 = t0.plus(std::time::Duration::from_secs(20));
        let (v2, _) = fan_speed(&cfg, t2, TowerId::T1, &s, 0.0, &mut state);
        assert!((v2 - 3.7).abs() < 1e-12);
    }

    #[test]
    fn pid_fallback_steps_by_demand() {
        let mut cfg = EngineConfig::default();
        cfg.fan.pid_dt_s = 0.0; // forces the PID to reject every sample
        let now = Stamp::from_secs(10_000);
        let mut state = PlantState::default();
        state.tower_run[0] = TowerRun::Running {
            since: Stamp::from_secs(0),
        };
        state.fan_pid[0] = PidMemory::at_output(3.0);
        state.ramp[0] = Some(RampState::at(3.0, Stamp::from_secs(0)));
        let s = sensors(95.0, 75.0);

        // High demand: fallback steps the anchor up by 0.1 V.
        fan_speed(&cfg, now, TowerId::T1, &s, 80.0, &mut state);
        assert!((state.fan_pid[0].last_output - 3.1).abs() < 1e-12);

        // Low demand: steps down.
        fan_speed(&cfg, now, TowerId::T1, &s, 10.0, &mut state);
        assert!((state.fan_pid[0].last_output - 3.0).abs() < 1e-12);

        // Mid demand: unchanged.
        fan_speed(&cfg, now, TowerId::T1, &s, 40.0, &mut state);
        assert!((state.fan_pid[0].last_output - 3.0).abs() < 1e-12);
    }

    #[test]
    fn restart_resets_pid_and_ramp() {
        let cfg = EngineConfig::default();
        let now = Stamp::from_secs(1_000);
        let mut state = PlantState::default();
        state.fan_pid[0].integral = 40.0;
        state.fan_pid[0].last_output = 4.5;
        let s = sensors(90.0, 75.0);

        plan_for(&cfg, now, &s, &mut state);
        assert_eq!(state.fan_pid[0].integral, 0.0);
        assert_eq!(state.fan_pid[0].last_output, 2.6);
        assert_eq!(state.ramp[0].unwrap().current_v, 2.6);
    }
}
