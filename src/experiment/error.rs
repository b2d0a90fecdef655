//! 实验层错误类型

use std::io;
use std::path::PathBuf;

use crate::net::{AddressError, NetFault, NodeId};
use crate::sim::SimTime;

/// 配置错误：在任何事件执行之前检测
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("unknown congestion control {0:?} (supported: reno, newreno)")]
    UnknownCongestionControl(String),
    #[error("wireless topology needs exactly {expected} positions, got {got}")]
    PositionCount { expected: usize, got: usize },
    #[error("{what} at {at} must be before the experiment horizon {horizon}")]
    AfterHorizon {
        what: &'static str,
        at: SimTime,
        horizon: SimTime,
    },
    #[error("duration_secs {secs} does not fit the simulation clock")]
    DurationOutOfRange { secs: f64 },
    #[error("receiver must start strictly before sender (receiver {receiver}, sender {sender})")]
    StartOrder { receiver: SimTime, sender: SimTime },
    #[error("invalid propagation loss model: {0}")]
    PropagationLoss(String),
}

/// 拓扑构建错误
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("topology has {got} devices, expected {expected}")]
    DeviceCount { expected: usize, got: usize },
    #[error("topology has {got} addressed interfaces for {expected} devices")]
    AddressCount { expected: usize, got: usize },
    #[error("node {0:?} has no IPv4 address")]
    Unaddressed(NodeId),
}

/// 结果输出错误
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open output {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {metric} samples: {source}")]
    Write {
        metric: &'static str,
        #[source]
        source: io::Error,
    },
}

/// 一次实验的顶层错误
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
    #[error("output error: {0}")]
    Emit(#[from] EmitError),
    #[error("simulation aborted: {0}")]
    Engine(#[from] NetFault),
}
