use crate::experiment::{BindStrategy, ExperimentConfig, ExperimentRunner, Metric, ResultEmitter};
use crate::sim::SimTime;

fn short_wired(duration_secs: f64) -> ExperimentConfig {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.duration_secs = duration_secs;
    cfg
}

fn values(emitter: &ResultEmitter, metric: Metric) -> Vec<(SimTime, f64)> {
    emitter
        .samples()
        .into_iter()
        .filter(|s| s.metric == metric)
        .map(|s| (s.at, s.value))
        .collect()
}

#[test]
fn binding_on_connect_captures_initial_values() {
    let runner = ExperimentRunner::new(short_wired(1.0)).expect("valid config");
    let emitter = ResultEmitter::in_memory();
    runner.run(&emitter).expect("run");

    let cwnd = values(&emitter, Metric::Cwnd);
    let ssthresh = values(&emitter, Metric::Ssthresh);
    assert!(!cwnd.is_empty());
    assert_eq!(cwnd[0].1, 10_000.0);
    assert_eq!(ssthresh.first().map(|s| s.1), Some(4_294_967_295.0));
    // 两者都在连接建立时刻首次出现
    assert_eq!(cwnd[0].0, ssthresh[0].0);
    assert!(cwnd[0].0 > SimTime::from_millis(1));
    assert!(cwnd.windows(2).all(|w| w[0].0 <= w[1].0));
}

#[test]
fn deferred_binding_before_socket_exists_leaves_series_empty() {
    let mut cfg = short_wired(1.0);
    cfg.instrumentation.bind = BindStrategy::Deferred {
        delay: Some(SimTime::from_micros(500)),
    };
    let runner = ExperimentRunner::new(cfg).expect("valid config");
    let emitter = ResultEmitter::in_memory();
    let report = runner.run(&emitter).expect("run continues without traces");

    assert!(values(&emitter, Metric::Cwnd).is_empty());
    assert!(values(&emitter, Metric::Ssthresh).is_empty());
    assert_eq!(report.samples.cwnd, 0);
    assert!(report.samples.throughput > 0);
    assert!(report.total_rx > 0);
}

#[test]
fn deferred_binding_after_connect_misses_initial_values() {
    let mut cfg = short_wired(2.0);
    cfg.instrumentation.bind = BindStrategy::Deferred { delay: None };
    let runner = ExperimentRunner::new(cfg).expect("valid config");
    let emitter = ResultEmitter::in_memory();
    runner.run(&emitter).expect("run");

    let cwnd = values(&emitter, Metric::Cwnd);
    assert!(!cwnd.is_empty());
    // 缺省延迟为时长的 1%（20ms）
    assert!(cwnd[0].0 >= SimTime::from_millis(20));
    assert!(cwnd[0].1 > 10_000.0);
}
