//! 数据包类型
//!
//! 定义网络数据包。逐跳转发由路由表决定，packet 只携带端点。

use super::id::NodeId;
use super::transport::Transport;

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    /// 网络层大小（含 IP/TCP 头，不含链路层开销）
    pub size_bytes: u32,
    pub src: NodeId,
    pub dst: NodeId,
    pub hops_taken: u32,
    pub transport: Transport,
}

impl Packet {
    /// 记录经过一跳
    pub fn advance(mut self) -> Self {
        self.hops_taken = self.hops_taken.saturating_add(1);
        self
    }
}
