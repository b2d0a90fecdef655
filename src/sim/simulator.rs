//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::event::{Event, World};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 同一时刻的事件按调度顺序（FIFO）执行。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    stopped: bool,
    executed: u64,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 累计已执行的事件数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 调度事件在指定时间执行；早于当前时间的请求按当前时间处理。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, ?at, seq, event_type = std::any::type_name::<E>(), "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    /// 相对当前时间延迟 `delay` 后执行。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    /// 请求停止：当前事件执行完毕后运行循环立即返回，剩余事件不再执行。
    pub fn stop(&mut self) {
        debug!(now = ?self.now, "收到停止请求");
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// 运行直到事件队列为空、到达 `until`（含）或被 `stop()`。
    #[tracing::instrument(skip(self, world))]
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        info!(now = ?self.now, queue_size = self.q.len(), "▶️  开始运行仿真");
        while let Some(top) = self.q.peek() {
            if self.stopped || top.at > until {
                break;
            }
            let Some(item) = self.q.pop() else { break };
            self.now = item.at;
            self.executed += 1;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        if !self.stopped && until != SimTime::MAX {
            self.now = self.now.max(until);
        }
        info!(
            total_events = self.executed,
            final_time = ?self.now,
            remaining_queue = self.q.len(),
            stopped = self.stopped,
            "✅ 仿真完成"
        );
    }

    /// 运行所有事件直到队列为空（或被 `stop()`）。
    pub fn run(&mut self, world: &mut dyn World) {
        self.run_until(SimTime::MAX, world);
    }
}
