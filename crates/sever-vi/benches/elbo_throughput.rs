use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;
use sever_dist::Registry;
use sever_vi::{VarFamily, ViConfig, ViSolver};

fn elbo_throughput_bench(c: &mut Criterion) {
    c.bench_function("vi_optimize_gaussian_target_100iter", |b| {
        b.iter(|| {
            let config = ViConfig {
                max_iterations: 100,
                sample_size: 50,
                seed: Some(1),
                ..ViConfig::default()
            };
            let mut solver = ViSolver::new(config, Registry::new());
            solver.init_variable("x", VarFamily::Gaussian).unwrap();
            let stats = solver.optimize(
                |p: &IndexMap<String, f64>, _: &()| -0.5 * p["x"] * p["x"],
                &(),
            );
            black_box(stats.final_elbo);
        });
    });
}

criterion_group!(benches, elbo_throughput_bench);
criterion_main!(benches);
