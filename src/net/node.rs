//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、路由器/接入点）。

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;
use tracing::{debug, trace};

/// 节点在实验中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Client,
    /// 有线拓扑中的路由器，或无线拓扑中的接入点
    Router,
    Server,
}

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 节点角色
    fn role(&self) -> NodeRole;

    /// 处理到达的数据包
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);
}

/// 主机节点（客户端/服务端）：只接收发给自己的包，不做转发。
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    role: NodeRole,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> NodeRole {
        self.role
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        trace!(node = %self.name, pkt_id = pkt.id, dst = ?pkt.dst, "🖥️  Host 处理数据包");
        if self.id == pkt.dst {
            net.on_delivered(self.id, pkt, sim);
        } else {
            debug!(node = %self.name, pkt_id = pkt.id, "主机不转发，丢弃");
            net.stats.dropped_pkts += 1;
        }
    }
}

/// 路由器 / 无线接入点：按路由表转发。
#[derive(Debug)]
pub struct Router {
    id: NodeId,
    name: String,
}

impl Router {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Router {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> NodeRole {
        NodeRole::Router
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        trace!(node = %self.name, pkt_id = pkt.id, dst = ?pkt.dst, "🔀 Router 处理数据包");
        if self.id == pkt.dst {
            net.on_delivered(self.id, pkt, sim);
        } else {
            net.forward_from(self.id, pkt, sim);
        }
    }
}
