//! 接收端应用

use tracing::{debug, info};

use super::SinkId;
use crate::net::{NodeId, with_tcp_stack};
use crate::sim::{Event, Simulator, World};

#[derive(Debug, Clone)]
pub struct PacketSink {
    pub node: NodeId,
    pub port: u16,
    listening: bool,
    total_rx: u64,
}

impl PacketSink {
    pub fn new(node: NodeId, port: u16) -> Self {
        Self {
            node,
            port,
            listening: false,
            total_rx: 0,
        }
    }

    pub fn total_rx(&self) -> u64 {
        self.total_rx
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub(crate) fn on_rx(&mut self, bytes: u64) {
        if self.listening {
            self.total_rx = self.total_rx.saturating_add(bytes);
        }
    }
}

/// 事件：接收端开始监听
#[derive(Debug)]
pub struct SinkStart {
    pub sink: SinkId,
}

impl Event for SinkStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SinkStart { sink } = *self;
        with_tcp_stack(world, |net, tcp| {
            let Some(s) = net.apps.sink_mut(sink) else {
                return;
            };
            s.listening = true;
            info!(now = ?sim.now(), node = ?s.node, port = s.port, "📥 接收端启动");
            tcp.listen(s.node, s.port, sink);
        });
    }
}

/// 事件：接收端停止监听，之后到达的数据不再计数
#[derive(Debug)]
pub struct SinkStop {
    pub sink: SinkId,
}

impl Event for SinkStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SinkStop { sink } = *self;
        with_tcp_stack(world, |net, tcp| {
            let Some(s) = net.apps.sink_mut(sink) else {
                return;
            };
            s.listening = false;
            debug!(now = ?sim.now(), total_rx = s.total_rx, "接收端停止");
            tcp.unlisten(s.node, s.port);
        });
    }
}
