//! 网络拓扑管理
//!
//! 定义网络拓扑结构：节点、设备、接口、点对点链路、无线信道、路由，
//! 以及挂在网络上的传输层（TCP）与应用层状态。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::address::{AddressError, Interface};
use super::deliver_packet::DeliverPacket;
use super::id::{ChannelId, DeviceId, LinkId, NodeId};
use super::link::{Link, LinkReady};
use super::node::{Host, Node, NodeRole, Router};
use super::packet::Packet;
use super::rate::DataRate;
use super::routing::RoutingTable;
use super::stats::Stats;
use super::transport::Transport;
use super::wifi::{Position, WifiChannel, WifiDevice, WifiPhyConfig, WifiRole};
use crate::app::Apps;
use crate::proto::tcp::TcpStack;
use crate::queue::{DropTailQueue, mem_from_pkt};
use crate::sim::{SimTime, Simulator};
use tracing::{debug, error, trace, warn};

/// 网络设备
#[derive(Debug)]
pub enum NetDevice {
    /// 点对点网卡：`link` 为本端发出的单向链路
    PointToPoint {
        node: NodeId,
        link: LinkId,
        peer: NodeId,
    },
    Wifi(WifiDevice),
}

impl NetDevice {
    pub fn node(&self) -> NodeId {
        match self {
            NetDevice::PointToPoint { node, .. } => *node,
            NetDevice::Wifi(dev) => dev.node,
        }
    }
}

/// 仿真运行期间出现、无法继续的网络错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetFault {
    #[error("no route from node {from:?} to node {dst:?}")]
    NoRoute { from: NodeId, dst: NodeId },
    #[error("node {from:?} has no device towards neighbour {to:?}")]
    NoDevice { from: NodeId, to: NodeId },
}

/// 网络拓扑
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    node_names: Vec<String>,
    node_roles: Vec<NodeRole>,
    devices: Vec<NetDevice>,
    node_devices: Vec<Vec<DeviceId>>,
    interfaces: Vec<Interface>,
    links: Vec<Link>,
    pub(crate) channels: Vec<WifiChannel>,
    /// (from, neighbour) -> 出口设备
    edges: HashMap<(NodeId, NodeId), DeviceId>,
    /// 按添加顺序记录的邻接关系，保证路由计算确定
    adj: Vec<Vec<NodeId>>,
    routing: RoutingTable,
    next_pkt_id: u64,
    pub(crate) rng: ChaCha8Rng,
    fault: Option<NetFault>,
    pub stats: Stats,
    pub tcp: TcpStack,
    pub apps: Apps,
}

impl Default for Network {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Network {
    /// 以指定随机种子创建空网络（种子只影响无线退避与帧错误抽样）
    pub fn with_seed(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            node_names: Vec::new(),
            node_roles: Vec::new(),
            devices: Vec::new(),
            node_devices: Vec::new(),
            interfaces: Vec::new(),
            links: Vec::new(),
            channels: Vec::new(),
            edges: HashMap::new(),
            adj: Vec::new(),
            routing: RoutingTable::new(),
            next_pkt_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            fault: None,
            stats: Stats::default(),
            tcp: TcpStack::default(),
            apps: Apps::default(),
        }
    }

    fn push_node(&mut self, node: Box<dyn Node>) -> NodeId {
        let id = node.id();
        self.node_names.push(node.name().to_string());
        self.node_roles.push(node.role());
        self.nodes.push(Some(node));
        self.node_devices.push(Vec::new());
        self.adj.push(Vec::new());
        id
    }

    /// 添加主机节点（客户端或服务端）
    pub fn add_host(&mut self, name: impl Into<String>, role: NodeRole) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.push_node(Box::new(Host::new(id, name, role)))
    }

    /// 添加路由器（无线拓扑中作为接入点）
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.push_node(Box::new(Router::new(id, name)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_names.get(id.0).map(String::as_str)
    }

    pub fn node_role(&self, id: NodeId) -> Option<NodeRole> {
        self.node_roles.get(id.0).copied()
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, device: DeviceId) {
        if self.edges.insert((from, to), device).is_none() {
            self.adj[from.0].push(to);
        }
    }

    fn push_device(&mut self, dev: NetDevice) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.node_devices[dev.node().0].push(id);
        self.devices.push(dev);
        id
    }

    /// 用一对单向链路连接两个节点，返回两端的网卡 `(a 侧, b 侧)`。
    pub fn connect_p2p(
        &mut self,
        a: NodeId,
        b: NodeId,
        rate: DataRate,
        latency: SimTime,
        queue_pkts: u64,
    ) -> (DeviceId, DeviceId) {
        let queue_bytes = mem_from_pkt(queue_pkts);
        let ab = LinkId(self.links.len());
        self.links.push(Link::new(a, b, latency, rate, queue_bytes));
        let ba = LinkId(self.links.len());
        self.links.push(Link::new(b, a, latency, rate, queue_bytes));

        let dev_a = self.push_device(NetDevice::PointToPoint {
            node: a,
            link: ab,
            peer: b,
        });
        let dev_b = self.push_device(NetDevice::PointToPoint {
            node: b,
            link: ba,
            peer: a,
        });
        self.add_edge(a, b, dev_a);
        self.add_edge(b, a, dev_b);
        debug!(?a, ?b, %rate, ?latency, "点对点链路已创建");
        (dev_a, dev_b)
    }

    /// 创建一个共享无线信道
    pub fn add_wifi_channel(&mut self, phy: WifiPhyConfig) -> ChannelId {
        let id = ChannelId(self.channels.len());
        self.channels.push(WifiChannel::new(id, phy));
        id
    }

    /// 在节点上安装无线网卡。STA 只与同信道的 AP 互为邻居。
    pub fn add_wifi_device(
        &mut self,
        node: NodeId,
        channel: ChannelId,
        role: WifiRole,
        position: Position,
        queue_pkts: u64,
    ) -> DeviceId {
        let peers: Vec<(NodeId, DeviceId, WifiRole)> = self.channels[channel.0]
            .devices
            .iter()
            .filter_map(|&d| match &self.devices[d.0] {
                NetDevice::Wifi(w) => Some((w.node, d, w.role)),
                NetDevice::PointToPoint { .. } => None,
            })
            .collect();

        let id = self.push_device(NetDevice::Wifi(WifiDevice {
            node,
            channel,
            role,
            position,
            queue: DropTailQueue::with_packets(queue_pkts),
            head: None,
            access_pending: false,
        }));
        self.channels[channel.0].devices.push(id);

        for (peer_node, peer_dev, peer_role) in peers {
            // STA 之间不直接通信
            if role == WifiRole::AccessPoint || peer_role == WifiRole::AccessPoint {
                self.add_edge(node, peer_node, id);
                self.add_edge(peer_node, node, peer_dev);
            }
        }
        debug!(?node, ?channel, ?role, x = position.x, "无线网卡已安装");
        id
    }

    pub fn device(&self, id: DeviceId) -> Option<&NetDevice> {
        self.devices.get(id.0)
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> Option<&mut NetDevice> {
        self.devices.get_mut(id.0)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices_of(&self, node: NodeId) -> &[DeviceId] {
        self.node_devices
            .get(node.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    /// 为设备绑定一个 IPv4 地址
    pub fn assign_address(
        &mut self,
        device: DeviceId,
        addr: Ipv4Addr,
        prefix_len: u8,
    ) -> Result<Interface, AddressError> {
        let node = self
            .devices
            .get(device.0)
            .map(NetDevice::node)
            .ok_or(AddressError::UnknownDevice(device))?;
        if let Some(existing) = self.interfaces.iter().find(|i| i.device == device) {
            return Err(AddressError::AlreadyAssigned {
                device,
                addr: existing.addr,
            });
        }
        let iface = Interface {
            node,
            device,
            addr,
            prefix_len,
        };
        self.interfaces.push(iface);
        Ok(iface)
    }

    /// 所有已分配的接口（按分配顺序）
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn interfaces_of(&self, node: NodeId) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter().filter(move |i| i.node == node)
    }

    /// 按地址查找节点
    pub fn node_by_addr(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.interfaces
            .iter()
            .find(|i| i.addr == addr)
            .map(|i| i.node)
    }

    /// 全局路由计算：拓扑构建完成后调用一次。
    pub fn populate_routing_tables(&mut self) {
        let n = self.nodes.len();
        let mut rev_adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for (from, outs) in self.adj.iter().enumerate() {
            for to in outs {
                rev_adj[to.0].push(NodeId(from));
            }
        }
        self.routing.build(&self.adj, &rev_adj);
        debug!(nodes = n, "路由表已计算");
    }

    pub fn next_hop(&self, from: NodeId, dst: NodeId) -> Option<NodeId> {
        self.routing.next_hop(from, dst)
    }

    /// 创建数据包
    pub fn make_packet(
        &mut self,
        flow_id: u64,
        size_bytes: u32,
        src: NodeId,
        dst: NodeId,
        transport: Transport,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            src,
            dst,
            hops_taken: 0,
            transport,
        }
    }

    /// 记录一个致命错误并请求仿真器停止
    pub(crate) fn record_fault(&mut self, fault: NetFault, sim: &mut Simulator) {
        error!(%fault, now = ?sim.now(), "网络错误，终止仿真");
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
        sim.stop();
    }

    pub fn fault(&self) -> Option<&NetFault> {
        self.fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<NetFault> {
        self.fault.take()
    }

    /// 将数据包交付给节点处理
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let Some(mut node) = self.nodes.get_mut(to.0).and_then(Option::take) else {
            warn!(?to, pkt_id = pkt.id, "节点不存在或正忙，丢弃数据包");
            self.stats.dropped_pkts += 1;
            return;
        };
        node.on_packet(pkt, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点把数据包发往下一跳
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let Some(next) = self.routing.next_hop(from, pkt.dst) else {
            self.record_fault(NetFault::NoRoute { from, dst: pkt.dst }, sim);
            return;
        };
        let Some(&dev) = self.edges.get(&(from, next)) else {
            self.record_fault(NetFault::NoDevice { from, to: next }, sim);
            return;
        };
        trace!(pkt_id = pkt.id, ?from, ?next, ?dev, "查找下一跳");

        match &self.devices[dev.0] {
            NetDevice::PointToPoint { link, .. } => {
                let link = *link;
                self.p2p_send(link, pkt, sim);
            }
            NetDevice::Wifi(_) => self.wifi_enqueue(dev, pkt, sim),
        }
    }

    /// 点对点发送：链路空闲则立即串行发送，否则进入设备队列
    fn p2p_send(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        if link.busy {
            if let Err(dropped) = link.queue.enqueue(pkt) {
                debug!(pkt_id = dropped.id, ?link_id, q_bytes = link.queue.bytes(), "🗑️  队列溢出丢包");
                self.stats.dropped_pkts += 1;
            }
            return;
        }
        self.p2p_start_tx(link_id, pkt, sim);
    }

    fn p2p_start_tx(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        let now = sim.now();
        let depart = now.saturating_add(link.tx_time(pkt.size_bytes));
        let arrive = depart.saturating_add(link.latency);
        link.busy = true;
        let to = link.to;
        trace!(pkt_id = pkt.id, ?link_id, ?depart, ?arrive, "开始串行发送");
        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                pkt: pkt.advance(),
            },
        );
    }

    /// 链路完成一次发送：取队列中的下一个包继续发送
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        link.busy = false;
        if let Some(pkt) = link.queue.dequeue() {
            self.p2p_start_tx(link_id, pkt, sim);
        }
    }
}
