use crate::experiment::{
    BindStrategy, ConfigError, ExperimentConfig, ThroughputUnit, TopologyVariant,
};
use crate::net::{DataRate, PropagationLoss, WifiMode};
use crate::sim::SimTime;

#[test]
fn presets_validate_and_reproduce_reference_scenarios() {
    let wired = ExperimentConfig::wired();
    wired.validate().expect("wired preset");
    assert_eq!(wired.output_prefix(), "wired");
    assert_eq!(wired.horizon(), SimTime::from_secs(60));
    let TopologyVariant::Wired(w) = &wired.topology else {
        panic!("expected wired topology");
    };
    assert_eq!(w.link_rate_1, DataRate::from_mbps(10));
    assert_eq!(w.link_rate_2, DataRate::from_mbps(5));
    assert_eq!(w.propagation_delay, SimTime::from_millis(2));

    let wireless = ExperimentConfig::wireless();
    wireless.validate().expect("wireless preset");
    assert_eq!(wireless.output_prefix(), "wireless");
    assert_eq!(wireless.traffic.data_rate, DataRate::from_mbps(100));
    let TopologyVariant::Wireless(p) = &wireless.topology else {
        panic!("expected wireless topology");
    };
    assert_eq!(p.phy_data_mode, WifiMode::HtMcs3);
    assert_eq!(p.phy_control_mode, WifiMode::HtMcs0);
    assert_eq!(p.positions.len(), 3);
}

#[test]
fn json_config_fills_defaults_and_parses_units() {
    let cfg = ExperimentConfig::from_json_str(
        r#"
{
    "name": "short",
    "topology": { "kind": "wired", "link_rate_2": "2Mbps", "propagation_delay": "5ms" },
    "traffic": { "duration_secs": 5, "congestion_control": "newreno" },
    "sampling": { "interval_ms": 50, "unit": "mbps" },
    "instrumentation": { "bind": { "mode": "deferred", "delay": "20ms" } },
    "seed": 7
}
        "#,
    )
    .expect("parse config");
    cfg.validate().expect("valid");

    assert_eq!(cfg.output_prefix(), "short");
    let TopologyVariant::Wired(w) = &cfg.topology else {
        panic!("expected wired topology");
    };
    assert_eq!(w.link_rate_1, DataRate::from_mbps(10));
    assert_eq!(w.link_rate_2, DataRate::from_mbps(2));
    assert_eq!(w.propagation_delay, SimTime::from_millis(5));
    assert_eq!(cfg.traffic.segment_size, 1000);
    assert_eq!(cfg.sampling.unit, ThroughputUnit::Mbps);
    assert_eq!(cfg.bind_delay(), Some(SimTime::from_millis(20)));
    assert_eq!(cfg.seed, 7);
}

#[test]
fn wireless_json_accepts_loss_model() {
    let cfg = ExperimentConfig::from_json_str(
        r#"
{
    "topology": {
        "kind": "wireless",
        "propagation_loss": { "kind": "log_distance", "exponent": 3.0,
                              "reference_distance_m": 1.0, "reference_loss_db": 46.67 },
        "positions": [ { "x": 0 }, { "x": 50 }, { "x": 100 } ]
    }
}
        "#,
    )
    .expect("parse config");
    cfg.validate().expect("valid");
    let TopologyVariant::Wireless(p) = &cfg.topology else {
        panic!("expected wireless topology");
    };
    assert!(matches!(p.propagation_loss, PropagationLoss::LogDistance { .. }));
    assert_eq!(p.positions[2].x, 100.0);
}

#[test]
fn malformed_values_are_rejected_at_parse_time() {
    let bad_rate = r#"{ "topology": { "kind": "wired", "link_rate_1": "fast" } }"#;
    assert!(matches!(
        ExperimentConfig::from_json_str(bad_rate),
        Err(ConfigError::Json(_))
    ));
    let bad_kind = r#"{ "topology": { "kind": "satellite" } }"#;
    assert!(matches!(
        ExperimentConfig::from_json_str(bad_kind),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn validation_catches_inconsistent_settings() {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.congestion_control = "cubic".to_string();
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::UnknownCongestionControl(name)) if name == "cubic"
    ));

    let mut cfg = ExperimentConfig::wired();
    cfg.sampling.interval_ms = 0;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::NotPositive { field: "interval_ms" })
    ));

    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.sender_start = SimTime::from_secs(61);
    assert!(matches!(cfg.validate(), Err(ConfigError::AfterHorizon { .. })));

    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.receiver_start = SimTime::from_millis(1);
    assert!(matches!(cfg.validate(), Err(ConfigError::StartOrder { .. })));

    let mut cfg = ExperimentConfig::wired();
    cfg.instrumentation.bind = BindStrategy::Deferred {
        delay: Some(SimTime::from_secs(60)),
    };
    assert!(matches!(cfg.validate(), Err(ConfigError::AfterHorizon { .. })));

    let mut cfg = ExperimentConfig::wireless();
    if let TopologyVariant::Wireless(p) = &mut cfg.topology {
        p.positions.pop();
    }
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::PositionCount { expected: 3, got: 2 })
    ));

    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.duration_secs = 0.0;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::NotPositive { field: "duration_secs" })
    ));
}

#[test]
fn deferred_binding_defaults_to_one_percent_of_horizon() {
    let mut cfg = ExperimentConfig::wired();
    assert_eq!(cfg.bind_delay(), None);
    cfg.instrumentation.bind = BindStrategy::Deferred { delay: None };
    assert_eq!(cfg.bind_delay(), Some(SimTime::from_millis(600)));
}

#[test]
fn durations_beyond_the_clock_range_are_rejected() {
    let mut cfg = ExperimentConfig::wired();
    cfg.traffic.duration_secs = 1e12;
    assert_eq!(cfg.horizon(), SimTime::MAX);
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::DurationOutOfRange { secs }) if secs == 1e12
    ));

    // 一年仍在范围内
    cfg.traffic.duration_secs = 365.0 * 86_400.0;
    cfg.validate().expect("one year fits");
}
