//! 业务模型：一条 TCP 批量流
//!
//! 接收端（PacketSink）在 server 的固定端口监听，发送端（OnOff）装在 client 上；
//! 接收端严格先于发送端启动，两者都在实验结束时刻停止。

use std::net::Ipv4Addr;

use tracing::info;

use super::config::TrafficConfig;
use super::error::TopologyError;
use crate::app::{OnOffParams, SinkId, SourceId};
use crate::net::{DataRate, Network, NodeId};
use crate::proto::tcp::TcpConfig;
use crate::sim::{SimTime, Simulator};

/// 每个实验恰好一条
#[derive(Debug, Clone)]
pub struct Flow {
    pub src: NodeId,
    pub dst: NodeId,
    pub dst_addr: Ipv4Addr,
    pub port: u16,
    pub segment_size: u32,
    pub data_rate: DataRate,
    pub duration: SimTime,
    pub sink: SinkId,
    pub source: SourceId,
}

pub struct TrafficModel;

impl TrafficModel {
    /// 安装接收端与发送端，并把拥塞控制等参数交给引擎
    #[tracing::instrument(skip(net, sim, traffic, tcp), fields(port = traffic.port))]
    pub fn attach_flow(
        net: &mut Network,
        sim: &mut Simulator,
        src: NodeId,
        dst: NodeId,
        traffic: &TrafficConfig,
        tcp: TcpConfig,
    ) -> Result<Flow, TopologyError> {
        let dst_addr = net
            .interfaces_of(dst)
            .next()
            .map(|i| i.addr)
            .ok_or(TopologyError::Unaddressed(dst))?;
        let horizon = traffic.horizon();
        net.tcp.set_config(tcp);

        let sink = net
            .apps
            .install_sink(dst, traffic.port, traffic.receiver_start, horizon, sim);
        let source = net.apps.install_source(
            src,
            OnOffParams {
                remote: dst_addr,
                port: traffic.port,
                packet_size: traffic.segment_size,
                data_rate: traffic.data_rate,
                on_time: traffic.on_time,
                off_time: traffic.off_time,
            },
            traffic.sender_start,
            horizon,
            sim,
        );
        info!(?src, ?dst, %dst_addr, rate = %traffic.data_rate, "🚚 业务流已安装");

        Ok(Flow {
            src,
            dst,
            dst_addr,
            port: traffic.port,
            segment_size: traffic.segment_size,
            data_rate: traffic.data_rate,
            duration: horizon,
            sink,
            source,
        })
    }
}
