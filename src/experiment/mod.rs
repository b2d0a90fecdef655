//! 实验编排与遥测
//!
//! 在仿真引擎之上搭建一次 TCP 拥塞动态实验：拓扑、业务流、拥塞状态订阅、
//! 吞吐量采样与结果输出。

pub mod config;
pub mod emitter;
pub mod error;
pub mod instrument;
pub mod runner;
pub mod sampler;
pub mod topology;
pub mod traffic;

pub use config::{
    BindStrategy, ExperimentConfig, InstrumentationConfig, SamplingConfig, ThroughputUnit,
    TopologyVariant, TrafficConfig, WiredParams, WirelessParams,
};
pub use emitter::{Metric, ResultEmitter, Sample, SampleCounts, SampleSink, SeriesHandle};
pub use error::{ConfigError, EmitError, ExperimentError, TopologyError};
pub use instrument::{BindTime, InstrumentationBinder};
pub use runner::{ExperimentRunner, Report};
pub use sampler::ThroughputSampler;
pub use topology::{Topology, TopologyBuilder};
pub use traffic::{Flow, TrafficModel};
