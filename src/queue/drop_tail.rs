//! DropTail（尾丢弃）队列
//!
//! 字节容量不足时丢弃新到达的 packet，并记录丢弃次数。

use std::collections::VecDeque;

use crate::net::Packet;

use super::{PacketQueue, mem_from_pkt};

#[derive(Debug)]
pub struct DropTailQueue {
    max_bytes: u64,
    cur_bytes: u64,
    drops: u64,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            cur_bytes: 0,
            drops: 0,
            q: VecDeque::new(),
        }
    }

    /// 以包个数指定容量（按 `DEFAULT_PKT_BYTES` 换算）
    pub fn with_packets(pkts: u64) -> Self {
        Self::new(mem_from_pkt(pkts))
    }

    /// 因容量不足被丢弃的包数
    pub fn drops(&self) -> u64 {
        self.drops
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        let sz = pkt.size_bytes as u64;
        if self.cur_bytes.saturating_add(sz) > self.max_bytes {
            self.drops = self.drops.saturating_add(1);
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(sz);
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn capacity_bytes(&self) -> u64 {
        self.max_bytes
    }
}
