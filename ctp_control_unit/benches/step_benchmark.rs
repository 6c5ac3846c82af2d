//! Benchmark of the full control cycle.
//!
//! The runner fires `step()` every 7 s; this bench confirms the cycle
//! cost is microseconds, i.e. vanishingly small against the period.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ctp_common::{RawSnapshot, Stamp, UiCommands};
use ctp_control_unit::{step, EngineConfig, PlantState};

fn warm_demand_snapshot(stamp: Stamp) -> RawSnapshot {
    RawSnapshot::from_pairs(
        stamp,
        [
            ("CH1", "75.0"),
            ("CH2", "85.0"),
            ("CH9", "85.0"),
            ("CH10", "95.0"),
            ("outdoorTemp", "80.0"),
            ("userSetpoint", "75.0"),
            ("CH8", "22.0"),
            ("AI1", "18.0"),
            ("AI2", "18.5"),
            ("WTV801_1", "2.1"),
        ],
    )
}

fn bench_step(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let ui = UiCommands::default();

    c.bench_function("step_warm_demand", |b| {
        let mut state = PlantState::default();
        let mut now = Stamp::from_secs(1_000_000);
        b.iter(|| {
            now = now.plus(std::time::Duration::from_secs(7));
            let raw = warm_demand_snapshot(now);
            black_box(step(&cfg, now, &raw, &ui, &mut state))
        });
    });

    c.bench_function("step_steady_state", |b| {
        let mut state = PlantState::default();
        let mut now = Stamp::from_secs(1_000_000);
        // Warm the state up so towers are past their startup window.
        for _ in 0..100 {
            now = now.plus(std::time::Duration::from_secs(7));
            step(&cfg, now, &warm_demand_snapshot(now), &ui, &mut state);
        }
        b.iter(|| {
            now = now.plus(std::time::Duration::from_secs(7));
            let raw = warm_demand_snapshot(now);
            black_box(step(&cfg, now, &raw, &ui, &mut state))
        });
    });
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
