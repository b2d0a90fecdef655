//! 实验编排
//!
//! 构建拓扑 → 安装业务流 → 安排订阅 → 启动吞吐量采样 → 运行到实验结束时刻 → 刷新输出 → 汇总。
//! 实验结束时刻只有一个来源（`TrafficConfig::duration_secs`），应用停止与仿真停止共用。

use std::path::{Path, PathBuf};

use tracing::info;

use super::config::ExperimentConfig;
use super::emitter::{Metric, ResultEmitter, SampleCounts};
use super::error::{ConfigError, ExperimentError};
use super::instrument::{BindTime, InstrumentationBinder};
use super::sampler::ThroughputSampler;
use super::topology::{Topology, TopologyBuilder};
use super::traffic::TrafficModel;
use crate::net::{NetWorld, Stats};
use crate::proto::tcp::TcpState;
use crate::sim::{SimTime, Simulator};

/// 一次实验的汇总
#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    pub variant: &'static str,
    /// 接收端累计收到的字节数
    pub total_rx: u64,
    pub samples: SampleCounts,
    pub final_time: SimTime,
    pub events: u64,
    /// 发送端连接最终状态；socket 从未创建时为 `None`
    pub sender_state: Option<TcpState>,
    pub retransmits: u64,
    pub stats: Stats,
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    cfg: ExperimentConfig,
}

impl ExperimentRunner {
    /// 校验配置；错误在任何事件执行之前返回
    pub fn new(cfg: ExperimentConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.cfg
    }

    /// 输出写到 `out_dir/<prefix>.{cwnd,ssthresh,throughput}`
    pub fn run_to_dir(&self, out_dir: &Path) -> Result<Report, ExperimentError> {
        let emitter = ResultEmitter::create(out_dir, self.cfg.output_prefix())?;
        let mut report = self.run(&emitter)?;
        report.outputs = emitter.paths().to_vec();
        Ok(report)
    }

    #[tracing::instrument(skip(self, emitter), fields(name = self.cfg.output_prefix()))]
    pub fn run(&self, emitter: &ResultEmitter) -> Result<Report, ExperimentError> {
        let mut world = NetWorld::with_seed(self.cfg.seed);
        let topo = TopologyBuilder::build(&mut world.net, &self.cfg.topology)?;
        self.run_on(world, &topo, emitter)
    }

    /// 在已构建好的网络上运行；`topo` 必须描述 `world` 中的节点
    pub(crate) fn run_on(
        &self,
        mut world: NetWorld,
        topo: &Topology,
        emitter: &ResultEmitter,
    ) -> Result<Report, ExperimentError> {
        let cfg = &self.cfg;
        let horizon = cfg.horizon();
        let mut sim = Simulator::default();

        let flow = TrafficModel::attach_flow(
            &mut world.net,
            &mut sim,
            topo.client,
            topo.server,
            &cfg.traffic,
            cfg.tcp_config()?,
        )?;

        let when = cfg.bind_delay().map_or(BindTime::OnConnect, BindTime::At);
        InstrumentationBinder::for_flow(&flow).bind_congestion_metrics(
            &mut world.net,
            &mut sim,
            when,
            emitter.handle(Metric::Cwnd),
            emitter.handle(Metric::Ssthresh),
        );
        ThroughputSampler::new(
            flow.sink,
            cfg.sampling.interval(),
            cfg.sampling.unit,
            emitter.handle(Metric::Throughput),
        )
        .start(&mut sim, cfg.sampling.start);

        info!(variant = topo.variant, ?horizon, "🚀 实验开始");
        sim.run_until(horizon, &mut world);

        if let Some(fault) = world.net.take_fault() {
            return Err(fault.into());
        }
        let samples = emitter.finish()?;

        let net = &world.net;
        let sender = net
            .apps
            .source(flow.source)
            .and_then(|s| s.conn())
            .and_then(|id| net.tcp.get(id));
        let report = Report {
            name: cfg.output_prefix().to_string(),
            variant: topo.variant,
            total_rx: net.apps.total_rx(flow.sink),
            samples,
            final_time: sim.now(),
            events: sim.executed(),
            sender_state: sender.map(|c| c.state()),
            retransmits: sender.map(|c| c.retransmits()).unwrap_or(0),
            stats: net.stats.clone(),
            outputs: Vec::new(),
        };
        info!(
            total_rx = report.total_rx,
            retransmits = report.retransmits,
            dropped = report.stats.dropped_pkts,
            "🏁 实验结束"
        );
        Ok(report)
    }
}
