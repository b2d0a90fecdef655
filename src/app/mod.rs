//! 应用层
//!
//! - `PacketSink`：在某端口监听，统计按序收到的载荷字节数
//! - `OnOffSource`：on 阶段以恒定速率向 TCP socket 写数据，off 阶段静默
//!
//! 应用对象保存在 `Network::apps` 中，由启动/停止事件驱动。

mod onoff;
mod sink;

pub use onoff::{OnOffSource, SourceSend, SourceStart, SourceStop};
pub use sink::{PacketSink, SinkStart, SinkStop};

use std::net::Ipv4Addr;

use crate::net::{DataRate, NodeId};
use crate::sim::{SimTime, Simulator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub usize);

/// 一个 on/off 源的参数
#[derive(Debug, Clone)]
pub struct OnOffParams {
    pub remote: Ipv4Addr,
    pub port: u16,
    /// 每次写入的字节数
    pub packet_size: u32,
    pub data_rate: DataRate,
    pub on_time: SimTime,
    /// 为零表示一直处于 on 阶段
    pub off_time: SimTime,
}

#[derive(Debug, Default)]
pub struct Apps {
    sinks: Vec<PacketSink>,
    sources: Vec<OnOffSource>,
}

impl Apps {
    /// 安装接收端，并调度其启动/停止
    pub fn install_sink(
        &mut self,
        node: NodeId,
        port: u16,
        start: SimTime,
        stop: SimTime,
        sim: &mut Simulator,
    ) -> SinkId {
        let id = SinkId(self.sinks.len());
        self.sinks.push(PacketSink::new(node, port));
        sim.schedule(start, SinkStart { sink: id });
        sim.schedule(stop, SinkStop { sink: id });
        id
    }

    /// 安装 on/off 源，并调度其启动/停止
    pub fn install_source(
        &mut self,
        node: NodeId,
        params: OnOffParams,
        start: SimTime,
        stop: SimTime,
        sim: &mut Simulator,
    ) -> SourceId {
        let id = SourceId(self.sources.len());
        self.sources.push(OnOffSource::new(node, params));
        sim.schedule(start, SourceStart { source: id });
        sim.schedule(stop, SourceStop { source: id });
        id
    }

    pub fn sink(&self, id: SinkId) -> Option<&PacketSink> {
        self.sinks.get(id.0)
    }

    pub fn source(&self, id: SourceId) -> Option<&OnOffSource> {
        self.sources.get(id.0)
    }

    /// 接收端累计收到的字节数；未知 id 视为 0
    pub fn total_rx(&self, id: SinkId) -> u64 {
        self.sink(id).map(PacketSink::total_rx).unwrap_or(0)
    }

    pub(crate) fn sink_mut(&mut self, id: SinkId) -> Option<&mut PacketSink> {
        self.sinks.get_mut(id.0)
    }

    pub(crate) fn source_mut(&mut self, id: SourceId) -> Option<&mut OnOffSource> {
        self.sources.get_mut(id.0)
    }

    /// TCP 交付按序字节
    pub(crate) fn sink_rx(&mut self, id: SinkId, bytes: u64) {
        if let Some(sink) = self.sink_mut(id) {
            sink.on_rx(bytes);
        }
    }
}
