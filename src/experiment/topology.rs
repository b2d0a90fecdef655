//! 拓扑构建
//!
//! 两种变体共用三节点：client(0) — router(1) — server(2)。
//! - wired：两条独立的点对点链路，各自一个 /24 子网
//! - wireless：单小区，router 作为 AP，client/server 为 STA，共用一个 /24 子网

use std::net::Ipv4Addr;

use tracing::info;

use super::config::{TopologyVariant, WiredParams, WirelessParams};
use super::error::TopologyError;
use crate::net::{
    AddressHelper, Interface, Network, NodeId, NodeRole, WifiPhyConfig, WifiRole,
};

/// 构建完成的拓扑；构建后不再变化
#[derive(Debug, Clone)]
pub struct Topology {
    pub variant: &'static str,
    pub client: NodeId,
    pub router: NodeId,
    pub server: NodeId,
    /// 按分配顺序排列的接口
    pub interfaces: Vec<Interface>,
    /// 接收端（server）地址
    pub server_addr: Ipv4Addr,
}

pub struct TopologyBuilder;

impl TopologyBuilder {
    #[tracing::instrument(skip(net, variant), fields(variant = variant.name()))]
    pub fn build(net: &mut Network, variant: &TopologyVariant) -> Result<Topology, TopologyError> {
        let client = net.add_host("client", NodeRole::Client);
        let router = net.add_router("router");
        let server = net.add_host("server", NodeRole::Server);

        let (interfaces, server_addr) = match variant {
            TopologyVariant::Wired(p) => Self::build_wired(net, p, client, router, server)?,
            TopologyVariant::Wireless(p) => Self::build_wireless(net, p, client, router, server)?,
        };

        let expected = match variant {
            TopologyVariant::Wired(_) => 4,
            TopologyVariant::Wireless(_) => 3,
        };
        if net.device_count() != expected {
            return Err(TopologyError::DeviceCount {
                expected,
                got: net.device_count(),
            });
        }
        if interfaces.len() != expected {
            return Err(TopologyError::AddressCount {
                expected,
                got: interfaces.len(),
            });
        }

        net.populate_routing_tables();
        info!(%server_addr, devices = expected, "🧱 拓扑构建完成");
        Ok(Topology {
            variant: variant.name(),
            client,
            router,
            server,
            interfaces,
            server_addr,
        })
    }

    fn build_wired(
        net: &mut Network,
        p: &WiredParams,
        client: NodeId,
        router: NodeId,
        server: NodeId,
    ) -> Result<(Vec<Interface>, Ipv4Addr), TopologyError> {
        let (c0, r0) = net.connect_p2p(client, router, p.link_rate_1, p.propagation_delay, p.queue_packets);
        let (r1, s1) = net.connect_p2p(router, server, p.link_rate_2, p.propagation_delay, p.queue_packets);

        let mut first = AddressHelper::new(Ipv4Addr::new(10, 1, 1, 0), 24)?;
        let mut interfaces = first.assign(net, &[c0, r0])?;
        let mut second = AddressHelper::new(Ipv4Addr::new(10, 1, 2, 0), 24)?;
        let server_side = second.assign(net, &[r1, s1])?;
        let server_addr = server_side
            .last()
            .map(|i| i.addr)
            .ok_or(TopologyError::AddressCount { expected: 2, got: 0 })?;
        interfaces.extend(server_side);
        Ok((interfaces, server_addr))
    }

    fn build_wireless(
        net: &mut Network,
        p: &WirelessParams,
        client: NodeId,
        router: NodeId,
        server: NodeId,
    ) -> Result<(Vec<Interface>, Ipv4Addr), TopologyError> {
        let position = |i: usize| p.positions.get(i).copied().unwrap_or_default();
        let channel = net.add_wifi_channel(WifiPhyConfig {
            data_mode: p.phy_data_mode,
            control_mode: p.phy_control_mode,
            loss: p.propagation_loss.clone(),
            ..WifiPhyConfig::default()
        });
        let ap = net.add_wifi_device(router, channel, WifiRole::AccessPoint, position(1), p.queue_packets);
        let sta_c = net.add_wifi_device(client, channel, WifiRole::Station, position(0), p.queue_packets);
        let sta_s = net.add_wifi_device(server, channel, WifiRole::Station, position(2), p.queue_packets);

        // AP 先分配：10.0.0.1，随后 client .2、server .3
        let mut helper = AddressHelper::new(Ipv4Addr::new(10, 0, 0, 0), 24)?;
        let interfaces = helper.assign(net, &[ap, sta_c, sta_s])?;
        let server_addr = interfaces
            .last()
            .map(|i| i.addr)
            .ok_or(TopologyError::AddressCount { expected: 3, got: 0 })?;
        Ok((interfaces, server_addr))
    }
}
