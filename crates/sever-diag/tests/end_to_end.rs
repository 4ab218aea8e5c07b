use indexmap::IndexMap;
use sever_diag::{export_trace_csv, gelman_rubin};
use sever_mcmc::{MhConfig, MhSampler};

fn standard_normal_logp(params: &IndexMap<String, f64>, _ctx: &()) -> f64 {
    let x = params["x"];
    -0.5 * x * x
}

fn run_chain(seed: u64) -> MhSampler {
    let config = MhConfig {
        num_samples: 1000,
        burnin: 500,
        step_size: 1.0,
        seed: Some(seed),
        ..MhConfig::default()
    };
    let mut sampler = MhSampler::new(config);
    sampler.init_parameter("x", 0.0);
    sampler.sample(standard_normal_logp, &()).unwrap();
    sampler
}

#[test]
fn scenario_s4_gelman_rubin_on_two_rwm_chains() {
    let chain_a = run_chain(1);
    let chain_b = run_chain(2);
    let trace_a = chain_a.get_trace("x").unwrap();
    let trace_b = chain_b.get_trace("x").unwrap();

    let rhat = gelman_rubin(&[trace_a, trace_b]).unwrap();
    assert!(rhat < 1.1, "rhat={rhat}");
}

#[test]
fn exported_csv_from_a_finished_sampler_round_trips_through_a_file() {
    let chain = run_chain(42);
    let mut traces = IndexMap::new();
    traces.insert("x".to_string(), chain.get_trace("x").unwrap().clone());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let file = std::fs::File::create(&path).unwrap();
    export_trace_csv(&traces, file).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().next().unwrap(), "iteration,x,log_prob,accepted");
    assert_eq!(contents.lines().count(), 1 + chain.get_trace("x").unwrap().len());
}
