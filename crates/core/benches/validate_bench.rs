//! Benchmarks for schedule validation.
//!
//! Measures single-instance replay and full validation runs, sequential and
//! sharded, at various scenario sizes.

use aslib_validate_core::{
    PerformanceType, RunStatus, ScenarioBuilder, ScenarioTables, ScheduleEntry,
    ScheduleReplaySimulator, ScheduleSet, Validator, ValidatorConfig,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic(instances: usize, algorithms: usize) -> (ScenarioTables, ScheduleSet) {
    let mut builder = ScenarioBuilder::runtime("bench", 100.0);
    let mut schedules = ScheduleSet::new();
    for i in 0..instances {
        let inst = format!("I{}", i);
        for a in 0..algorithms {
            let time = ((i * 31 + a * 17) % 150) as f64 + 0.5;
            builder = builder.run(&format!("A{}", a), &inst, time, RunStatus::Ok);
        }
        let schedule = (0..3)
            .map(|k| ScheduleEntry::run(format!("A{}", (i + k) % algorithms), 20.0 * (k + 1) as f64))
            .collect();
        schedules.insert(inst, schedule);
    }
    match builder.build() {
        Ok(data) => (data, schedules),
        Err(e) => panic!("synthetic scenario invalid: {}", e),
    }
}

fn bench_replay(c: &mut Criterion) {
    let (data, schedules) = synthetic(1, 10);
    let schedule = schedules.get("I0").cloned().unwrap_or_default();
    c.bench_function("replay_single_instance", |b| {
        b.iter(|| {
            ScheduleReplaySimulator::replay(
                black_box(&schedule),
                "I0",
                PerformanceType::Runtime,
                black_box(&data),
            )
        })
    });
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_runtime");
    group.sample_size(10);

    for &n in &[100, 1000, 10000] {
        let (data, schedules) = synthetic(n, 10);
        let sequential = Validator::new(ValidatorConfig::new().with_parallel(false));
        let sharded = Validator::default();

        group.bench_with_input(
            BenchmarkId::new("sequential", n),
            &(&data, &schedules),
            |b, (d, s)| b.iter(|| black_box(sequential.validate_runtime(s, *d, Some(*d)))),
        );
        group.bench_with_input(
            BenchmarkId::new("parallel", n),
            &(&data, &schedules),
            |b, (d, s)| b.iter(|| black_box(sharded.validate_runtime(s, *d, Some(*d)))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_replay, bench_validate);
criterion_main!(benches);
