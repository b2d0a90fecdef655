//! Protocol dispatch hooks for the network.

use crate::sim::Simulator;
use tracing::trace;

use super::{Network, NodeId, Packet, Transport, with_net_tcp};

impl Network {
    /// 数据包送达目的地时的处理：统计，然后交给传输层。
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, sim: &mut Simulator) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        trace!(
            pkt_id = pkt.id,
            ?at,
            delivered_pkts = self.stats.delivered_pkts,
            "✅ 数据包送达目的地"
        );

        // 传输层处理（目的端产生 ACK、源端处理 ACK 驱动继续发送）
        if let Transport::Tcp(hdr) = pkt.transport {
            let conn_id = pkt.flow_id;
            with_net_tcp(self, |net, tcp| tcp.on_tcp_segment(conn_id, at, hdr, sim, net));
        }
    }
}
