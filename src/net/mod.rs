//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：节点、点对点链路、无线信道、地址、路由和数据包。

// 子模块声明
mod address;
mod deliver_packet;
mod id;
mod link;
mod net_world;
mod network;
mod network_proto;
mod network_wifi;
mod node;
mod packet;
mod proto_bridge;
mod rate;
mod routing;
mod stats;
mod transport;
pub mod wifi;

// 重新导出公共接口
pub use address::{AddressError, AddressHelper, Interface};
pub use deliver_packet::DeliverPacket;
pub use id::{ChannelId, DeviceId, LinkId, NodeId};
pub use link::{Link, LinkReady, P2P_HEADER_BYTES};
pub use net_world::NetWorld;
pub use network::{NetDevice, NetFault, Network};
pub use network_wifi::WifiAccess;
pub use node::{Host, Node, NodeRole, Router};
pub use packet::Packet;
pub(crate) use proto_bridge::{with_net_tcp, with_tcp_stack};
pub use rate::{DataRate, RateParseError};
pub use routing::RoutingTable;
pub use stats::Stats;
pub use transport::{TcpHeader, TcpSegment, Transport};
pub use wifi::{Position, PropagationLoss, WifiMode, WifiPhyConfig, WifiRole};
