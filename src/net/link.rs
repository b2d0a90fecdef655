//! 点对点链路
//!
//! 单向链路：带宽、传播时延、设备发送队列（DropTail），以及串行化结束的 `LinkReady` 事件。

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::rate::DataRate;
use crate::queue::{DropTailQueue, PacketQueue};
use crate::sim::{Event, SimTime, Simulator, World};

/// 点对点帧头开销（PPP，字节）
pub const P2P_HEADER_BYTES: u32 = 2;

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub rate: DataRate,
    /// 正在串行发送时为 true；发送完成由 `LinkReady` 事件清除
    pub busy: bool,
    /// 链路上的排队策略
    pub queue: Box<dyn PacketQueue + Send>,
}

impl Link {
    /// 创建新链路
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, rate: DataRate, queue_bytes: u64) -> Self {
        Self {
            from,
            to,
            latency,
            rate,
            busy: false,
            queue: Box::new(DropTailQueue::new(queue_bytes)),
        }
    }

    /// 计算在该链路上发送一个网络层包所需的时间（含帧头）
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate
            .tx_time(bytes.saturating_add(P2P_HEADER_BYTES) as u64)
    }
}

/// 事件：链路上当前帧串行化结束，释放发送端并拉取设备队列中的下一个包
#[derive(Debug)]
pub struct LinkReady {
    pub link_id: LinkId,
}

impl Event for LinkReady {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let LinkReady { link_id } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.on_link_ready(link_id, sim);
    }
}
