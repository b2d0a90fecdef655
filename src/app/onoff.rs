//! On/Off 发送端应用
//!
//! on 阶段按 `data_rate` 每隔 `packet_size * 8 / data_rate` 向 socket 写一次
//! `packet_size` 字节；发送缓冲区满时本次写入被丢弃（只计入 `bytes_offered`）。

use tracing::{debug, info, warn};

use super::{OnOffParams, SourceId};
use crate::net::{NodeId, with_tcp_stack};
use crate::proto::tcp::TcpConnId;
use crate::sim::{Event, SimTime, Simulator, World};

#[derive(Debug, Clone)]
pub struct OnOffSource {
    pub node: NodeId,
    pub params: OnOffParams,
    conn: Option<TcpConnId>,
    started_at: Option<SimTime>,
    running: bool,
    bytes_offered: u64,
    bytes_written: u64,
}

impl OnOffSource {
    pub fn new(node: NodeId, params: OnOffParams) -> Self {
        Self {
            node,
            params,
            conn: None,
            started_at: None,
            running: false,
            bytes_offered: 0,
            bytes_written: 0,
        }
    }

    pub fn conn(&self) -> Option<TcpConnId> {
        self.conn
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn bytes_offered(&self) -> u64 {
        self.bytes_offered
    }

    /// 实际被 socket 接受的字节数
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// 两次写入之间的间隔
    pub fn send_interval(&self) -> SimTime {
        self.params
            .data_rate
            .tx_time(self.params.packet_size as u64)
            .max(SimTime(1))
    }

    /// `now` 处于 off 阶段时，返回下一个 on 阶段的开始时刻
    pub fn next_on_at(&self, now: SimTime) -> Option<SimTime> {
        let start = self.started_at?;
        let (on, off) = (self.params.on_time.0, self.params.off_time.0);
        if off == 0 {
            return None;
        }
        let period = on.saturating_add(off);
        let phase = now.saturating_sub(start).0 % period.max(1);
        (phase >= on).then(|| now.saturating_add(SimTime(period - phase)))
    }
}

/// 事件：发送端启动（创建 socket 并发起连接）
#[derive(Debug)]
pub struct SourceStart {
    pub source: SourceId,
}

impl Event for SourceStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SourceStart { source } = *self;
        let now = sim.now();
        with_tcp_stack(world, |net, tcp| {
            let Some(src) = net.apps.source(source) else {
                return;
            };
            let (node, remote, port) = (src.node, src.params.remote, src.params.port);
            let Some(dst) = net.node_by_addr(remote) else {
                warn!(%remote, "目的地址不属于任何节点，发送端不启动");
                return;
            };
            let conn = tcp.connect(node, dst, port, sim, net);
            let Some(src) = net.apps.source_mut(source) else {
                return;
            };
            src.conn = Some(conn);
            src.started_at = Some(now);
            src.running = true;
            info!(?now, ?node, %remote, port, conn_id = conn, "📤 发送端启动");
        });
        sim.schedule(now, SourceSend { source });
    }
}

/// 事件：发送端写一次数据，并调度下一次
#[derive(Debug)]
pub struct SourceSend {
    pub source: SourceId,
}

impl Event for SourceSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SourceSend { source } = *self;
        let now = sim.now();
        let next = with_tcp_stack(world, |net, tcp| {
            let src = net.apps.source(source)?;
            if !src.running {
                return None;
            }
            if let Some(on_at) = src.next_on_at(now) {
                return Some(on_at);
            }
            let (conn, size, interval) = (src.conn?, src.params.packet_size as u64, src.send_interval());
            let written = tcp.write(conn, size, sim, net);
            let src = net.apps.source_mut(source)?;
            src.bytes_offered += size;
            src.bytes_written += written;
            Some(now.saturating_add(interval))
        });
        if let Some(at) = next {
            sim.schedule(at, SourceSend { source });
        }
    }
}

/// 事件：发送端停止写数据
#[derive(Debug)]
pub struct SourceStop {
    pub source: SourceId,
}

impl Event for SourceStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SourceStop { source } = *self;
        with_tcp_stack(world, |net, _tcp| {
            if let Some(src) = net.apps.source_mut(source) {
                src.running = false;
                debug!(now = ?sim.now(), offered = src.bytes_offered, written = src.bytes_written, "发送端停止");
            }
        });
    }
}
