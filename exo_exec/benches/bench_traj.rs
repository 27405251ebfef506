//! # Trajectory Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use exo_lib::traj::{Interp, MinimumJerk, WayPoint};

fn traj_benchmark(c: &mut Criterion) {
    // ---- Build the neutral to top elbow move ----

    let neutral = WayPoint::at_zero(vec![-15f64.to_radians(), 0.0, 0.0, 0.0]);
    let top_elbow = WayPoint::new(
        Duration::from_secs(3),
        vec![
            20f64.to_radians(),
            45f64.to_radians(),
            0.0,
            15f64.to_radians(),
        ],
    );
    let max_rate = vec![
        60f64.to_radians(),
        60f64.to_radians(),
        100f64.to_radians(),
        60f64.to_radians(),
    ];

    let mut gen =
        MinimumJerk::new(Duration::from_millis(50), neutral.clone(), top_elbow.clone()).unwrap();

    // Bench arming the generator, as done on every sequencer transition
    for interp in [Interp::Linear, Interp::MinimumJerk].iter() {
        gen.set_trajectory_params(*interp, max_rate.clone())
            .unwrap();

        c.bench_function(&format!("MinimumJerk::set_endpoints::{:?}", interp), |b| {
            b.iter(|| {
                gen.set_endpoints(neutral.clone(), top_elbow.clone())
                    .unwrap()
            })
        });
    }

    // Bench evaluation, as done on every control tick
    let traj = gen.trajectory().clone();
    c.bench_function("Trajectory::at_time", |b| {
        let mut k = 0u64;
        b.iter(|| {
            k = (k + 1) % 3000;
            traj.at_time(black_box(Duration::from_millis(k)))
        })
    });

    c.bench_function("Trajectory::validate", |b| b.iter(|| traj.validate()));
}

criterion_group!(benches, traj_benchmark);
criterion_main!(benches);
