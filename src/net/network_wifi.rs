//! 无线信道的发送/接入逻辑

use rand::Rng;
use tracing::{debug, trace};

use super::deliver_packet::DeliverPacket;
use super::id::DeviceId;
use super::net_world::NetWorld;
use super::network::{NetDevice, NetFault, Network};
use super::packet::Packet;
use super::wifi::{CW_MIN, DIFS, MAX_RETRIES, SLOT, propagation_delay};
use crate::queue::PacketQueue;
use crate::sim::{Event, SimTime, Simulator, World};

/// 事件：某无线网卡尝试接入信道
#[derive(Debug)]
pub struct WifiAccess {
    pub device: DeviceId,
}

impl Event for WifiAccess {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let WifiAccess { device } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.on_wifi_access(device, sim);
    }
}

impl Network {
    /// DIFS + 随机退避之后的接入时刻
    fn wifi_backoff_at(&mut self, from: SimTime) -> SimTime {
        let slots = self.rng.random_range(0..=CW_MIN) as u64;
        from.saturating_add(DIFS)
            .saturating_add(SimTime(SLOT.0.saturating_mul(slots)))
    }

    /// 无线网卡入队；若网卡当前没有在途的接入尝试则发起一次
    pub(crate) fn wifi_enqueue(&mut self, dev_id: DeviceId, pkt: Packet, sim: &mut Simulator) {
        let Some(NetDevice::Wifi(dev)) = self.device_mut(dev_id) else {
            return;
        };
        if let Err(dropped) = dev.queue.enqueue(pkt) {
            debug!(pkt_id = dropped.id, ?dev_id, "🗑️  无线队列溢出丢包");
            self.stats.dropped_pkts += 1;
            return;
        }
        if dev.access_pending {
            return;
        }
        dev.access_pending = true;
        let channel = dev.channel;
        let idle_at = sim.now().max(self.channels[channel.0].busy_until);
        let at = self.wifi_backoff_at(idle_at);
        sim.schedule(at, WifiAccess { device: dev_id });
    }

    /// 接入尝试：信道忙则退避重试；空闲则发送队头帧
    pub(crate) fn on_wifi_access(&mut self, dev_id: DeviceId, sim: &mut Simulator) {
        let now = sim.now();
        let Some(NetDevice::Wifi(dev)) = self.device_mut(dev_id) else {
            return;
        };
        let channel = dev.channel;
        let busy_until = self.channels[channel.0].busy_until;
        if busy_until > now {
            let at = self.wifi_backoff_at(busy_until);
            sim.schedule(at, WifiAccess { device: dev_id });
            return;
        }

        let Some(NetDevice::Wifi(dev)) = self.device_mut(dev_id) else {
            return;
        };
        if dev.head.is_none() {
            dev.head = dev.queue.dequeue().map(|p| (p, 0));
        }
        let Some((pkt, failures)) = dev.head.take() else {
            dev.access_pending = false;
            return;
        };
        let from_node = dev.node;
        let from_pos = dev.position;

        let Some(next) = self.next_hop(from_node, pkt.dst) else {
            self.record_fault(
                NetFault::NoRoute {
                    from: from_node,
                    dst: pkt.dst,
                },
                sim,
            );
            return;
        };
        let to_pos = self.channels[channel.0]
            .devices
            .iter()
            .find_map(|&d| match self.device(d) {
                Some(NetDevice::Wifi(w)) if w.node == next => Some(w.position),
                _ => None,
            })
            .unwrap_or(from_pos);
        let distance = from_pos.distance_to(&to_pos);

        let phy = &self.channels[channel.0].phy;
        let data_air = phy.data_airtime(pkt.size_bytes);
        let exchange = phy.exchange_time(pkt.size_bytes);
        let per = phy.frame_error_prob(distance);
        self.channels[channel.0].busy_until = now.saturating_add(exchange);

        let ok = self.rng.random::<f64>() >= per;
        trace!(pkt_id = pkt.id, ?dev_id, ?next, distance, per, ok, "📡 无线帧发送");

        let retry = if ok {
            let arrive = now
                .saturating_add(data_air)
                .saturating_add(propagation_delay(distance));
            sim.schedule(
                arrive,
                DeliverPacket {
                    to: next,
                    pkt: pkt.advance(),
                },
            );
            None
        } else {
            let failures = failures + 1;
            self.stats.wifi_frame_errors += 1;
            if failures > MAX_RETRIES {
                debug!(pkt_id = pkt.id, ?dev_id, "无线帧重传次数耗尽，丢弃");
                self.stats.wifi_lost_pkts += 1;
                None
            } else {
                Some((pkt, failures))
            }
        };

        let Some(NetDevice::Wifi(dev)) = self.device_mut(dev_id) else {
            return;
        };
        dev.head = retry;
        if dev.head.is_none() && dev.queue.is_empty() {
            dev.access_pending = false;
            return;
        }
        let at = self.wifi_backoff_at(now.saturating_add(exchange));
        sim.schedule(at, WifiAccess { device: dev_id });
    }
}
