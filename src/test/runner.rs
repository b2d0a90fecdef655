use std::net::Ipv4Addr;

use crate::experiment::{
    ConfigError, ExperimentConfig, ExperimentError, ExperimentRunner, Metric, ResultEmitter,
    Sample, Topology,
};
use crate::net::{AddressHelper, DataRate, NetFault, NetWorld, NodeRole};
use crate::proto::tcp::TcpState;
use crate::sim::SimTime;

fn run(cfg: ExperimentConfig) -> (Vec<Sample>, crate::experiment::Report) {
    let runner = ExperimentRunner::new(cfg).expect("valid config");
    let emitter = ResultEmitter::in_memory();
    let report = runner.run(&emitter).expect("run");
    (emitter.samples(), report)
}

fn series(samples: &[Sample], metric: Metric) -> Vec<Sample> {
    samples.iter().copied().filter(|s| s.metric == metric).collect()
}

fn median(mut v: Vec<f64>) -> f64 {
    v.sort_by(f64::total_cmp);
    v[v.len() / 2]
}

#[test]
fn runner_rejects_invalid_config_before_running() {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.congestion_control = "cubic".to_string();
    assert!(matches!(
        ExperimentRunner::new(cfg),
        Err(ConfigError::UnknownCongestionControl(_))
    ));
}

#[test]
fn throughput_sample_count_matches_duration_over_interval() {
    for (secs, interval_ms) in [(2.0, 100u64), (3.0, 250), (1.0, 30)] {
        let mut cfg = ExperimentConfig::wired();
        cfg.traffic.duration_secs = secs;
        cfg.sampling.interval_ms = interval_ms;
        let (samples, report) = run(cfg);

        let expected = (secs * 1000.0 / interval_ms as f64).floor() as i64;
        let got = series(&samples, Metric::Throughput).len() as i64;
        assert!((got - expected).abs() <= 1, "{secs}s/{interval_ms}ms: {got} vs {expected}");
        assert_eq!(report.samples.throughput as i64, got);
        assert_eq!(report.final_time, SimTime::from_secs_f64(secs));
    }
}

#[test]
fn every_stream_is_time_ordered_and_throughput_non_negative() {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.duration_secs = 5.0;
    let (samples, _) = run(cfg);
    for metric in Metric::ALL {
        let s = series(&samples, metric);
        assert!(!s.is_empty(), "{metric:?}");
        assert!(s.windows(2).all(|w| w[0].at <= w[1].at), "{metric:?}");
    }
    assert!(series(&samples, Metric::Throughput).iter().all(|s| s.value >= 0.0));
}

#[test]
fn sampled_throughput_accounts_for_received_bytes() {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.duration_secs = 3.0;
    let interval = cfg.sampling.interval().as_secs_f64();
    let (samples, report) = run(cfg);

    // Σ delta = 最后一次采样时的累计值 ≤ 最终累计值
    let sum: f64 = series(&samples, Metric::Throughput)
        .iter()
        .map(|s| s.value * interval / 8.0)
        .sum();
    assert!(sum > 0.0);
    assert!(sum <= report.total_rx as f64 + 1.0, "{sum} vs {}", report.total_rx);
    // 最后一次采样（2.91s）之后最多 90ms 的数据
    let tail = 5_000_000.0 * 0.09 / 8.0;
    assert!(report.total_rx as f64 - sum <= tail + 2_000.0, "{sum} vs {}", report.total_rx);
}

#[test]
fn identical_config_and_seed_give_identical_results() {
    let mut cfg = ExperimentConfig::wireless();
    cfg.traffic.duration_secs = 2.0;
    cfg.seed = 11;
    let (a, ra) = run(cfg.clone());
    let (b, rb) = run(cfg);
    assert_eq!(ra.total_rx, rb.total_rx);
    assert_eq!(a, b);
}

#[test]
fn wired_scenario_converges_to_bottleneck_rate() {
    let (samples, report) = run(ExperimentConfig::wired());
    assert_eq!(report.sender_state, Some(TcpState::Established));

    let steady: Vec<f64> = series(&samples, Metric::Throughput)
        .iter()
        .filter(|s| s.at >= SimTime::from_secs(10))
        .map(|s| s.value)
        .collect();
    assert!(steady.len() >= 490);
    let m = median(steady.clone());
    assert!((3_500_000.0..=5_000_000.0).contains(&m), "median {m}");
    let over = steady.iter().filter(|&&v| v > 5_200_000.0).count();
    assert!(over * 20 < steady.len(), "{over} samples above bottleneck");

    // 5 Mbps 瓶颈 60 秒最多约 37.5 MB
    assert!(report.total_rx > 25_000_000, "{}", report.total_rx);
    assert!(report.total_rx < 37_500_000, "{}", report.total_rx);
}

#[test]
fn wireless_scenario_delivers_less_than_offered_load() {
    let mut cfg = ExperimentConfig::wireless();
    cfg.traffic.duration_secs = 20.0;
    let offered = cfg.traffic.data_rate.bps() as f64 * cfg.traffic.duration_secs / 8.0;
    let (samples, report) = run(cfg);

    assert!(report.total_rx > 0);
    assert!((report.total_rx as f64) < offered);
    assert!(!series(&samples, Metric::Cwnd).is_empty());
    assert_eq!(report.variant, "wireless");
}

#[test]
fn errors_name_their_layer() {
    let err: ExperimentError = ConfigError::NotPositive { field: "interval_ms" }.into();
    assert_eq!(
        err.to_string(),
        "configuration error: interval_ms must be positive"
    );
}

#[test]
fn on_off_source_is_silent_during_off_phases() {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.data_rate = DataRate::from_mbps(2);
    cfg.traffic.on_time = SimTime::from_secs(1);
    cfg.traffic.off_time = SimTime::from_secs(1);
    cfg.traffic.duration_secs = 4.0;
    let (samples, report) = run(cfg);

    let tput = series(&samples, Metric::Throughput);
    let in_window = |s: &Sample, from_ms: u64, to_ms: u64| {
        s.at >= SimTime::from_millis(from_ms) && s.at <= SimTime::from_millis(to_ms)
    };
    // off 阶段：1.001s~2.001s、3.001s~4s；留 100ms 给在途数据
    let off: Vec<&Sample> = tput
        .iter()
        .filter(|s| in_window(*s, 1_200, 2_000) || in_window(*s, 3_200, 4_000))
        .collect();
    assert!(off.len() >= 14, "{}", off.len());
    assert!(off.iter().all(|s| s.value == 0.0), "{off:?}");

    let on: Vec<&Sample> = tput
        .iter()
        .filter(|s| in_window(*s, 200, 1_000) || in_window(*s, 2_200, 3_000))
        .collect();
    assert!(on.iter().all(|s| s.value > 0.0), "{on:?}");

    // 2 Mbps × 2s on / 8 = 500000 字节
    let expected = 2_000_000.0 * 2.0 / 8.0;
    let got = report.total_rx as f64;
    assert!((got - expected).abs() <= expected * 0.02, "{got} vs {expected}");
}

#[test]
fn unreachable_server_aborts_run_with_engine_error() {
    // 与 wired 拓扑相同的链路与地址，但不计算路由
    let cfg = ExperimentConfig::wired();
    let runner = ExperimentRunner::new(cfg).expect("valid config");
    let mut world = NetWorld::with_seed(0);
    let net = &mut world.net;
    let client = net.add_host("client", NodeRole::Client);
    let router = net.add_router("router");
    let server = net.add_host("server", NodeRole::Server);
    let rate = DataRate::from_mbps(10);
    let delay = SimTime::from_millis(2);
    let (c0, r0) = net.connect_p2p(client, router, rate, delay, 100);
    let (r1, s1) = net.connect_p2p(router, server, rate, delay, 100);
    let mut interfaces = AddressHelper::new(Ipv4Addr::new(10, 1, 1, 0), 24)
        .expect("subnet")
        .assign(net, &[c0, r0])
        .expect("assign");
    interfaces.extend(
        AddressHelper::new(Ipv4Addr::new(10, 1, 2, 0), 24)
            .expect("subnet")
            .assign(net, &[r1, s1])
            .expect("assign"),
    );
    let topo = Topology {
        variant: "wired",
        client,
        router,
        server,
        interfaces,
        server_addr: Ipv4Addr::new(10, 1, 2, 2),
    };

    let emitter = ResultEmitter::in_memory();
    let err = runner
        .run_on(world, &topo, &emitter)
        .expect_err("run must fail without routes");
    assert!(
        matches!(err, ExperimentError::Engine(NetFault::NoRoute { from, dst }) if from == client && dst == server),
        "{err}"
    );
    // SYN 发出即中止，第一次采样（10ms）之前就停了
    assert!(emitter.samples().is_empty());
}
