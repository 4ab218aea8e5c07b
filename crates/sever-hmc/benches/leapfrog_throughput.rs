use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;
use sever_hmc::{HmcConfig, HmcSampler};

fn leapfrog_throughput_bench(c: &mut Criterion) {
    c.bench_function("hmc_sample_standard_normal_2k", |b| {
        b.iter(|| {
            let config = HmcConfig {
                initial_step_size: 0.1,
                num_leapfrog_steps: 10,
                adapt_step_size: false,
                seed: Some(1),
                ..HmcConfig::default()
            };
            let mut sampler = HmcSampler::new(config);
            sampler.init_parameter("x", 0.0, 1.0);
            sampler
                .sample(
                    2_000,
                    |p: &IndexMap<String, f64>, out: &mut IndexMap<String, f64>, _: &()| {
                        let x = p["x"];
                        out.insert("x".to_string(), -x);
                        -0.5 * x * x
                    },
                    &(),
                )
                .unwrap();
            black_box(sampler.get_acceptance_rate());
        });
    });
}

criterion_group!(benches, leapfrog_throughput_bench);
criterion_main!(benches);
