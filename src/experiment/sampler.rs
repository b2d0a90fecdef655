//! 吞吐量采样器
//!
//! 周期性读取接收端的累计字节数，按区间增量计算瞬时吞吐量：
//! `throughput = delta * 8 / (interval_secs * unit_scale)`。
//! 采样器自身保存上一次的累计值，随重新调度的事件一起移动；
//! 仿真循环停止后不再被调度。

use tracing::trace;

use super::config::ThroughputUnit;
use super::emitter::SeriesHandle;
use crate::app::SinkId;
use crate::net::NetWorld;
use crate::sim::{Event, SimTime, Simulator, World};

pub struct ThroughputSampler {
    sink: SinkId,
    interval: SimTime,
    divisor: f64,
    last_total_rx: u64,
    out: SeriesHandle,
}

impl ThroughputSampler {
    pub fn new(sink: SinkId, interval: SimTime, unit: ThroughputUnit, out: SeriesHandle) -> Self {
        Self {
            sink,
            interval,
            divisor: interval.as_secs_f64() * unit.scale(),
            last_total_rx: 0,
            out,
        }
    }

    /// 以新的累计字节数推进一次，返回 `(区间增量, 吞吐量)`
    pub fn tick(&mut self, total_rx: u64) -> (u64, f64) {
        let delta = total_rx.saturating_sub(self.last_total_rx);
        self.last_total_rx = total_rx;
        (delta, delta as f64 * 8.0 / self.divisor)
    }

    pub fn last_total_rx(&self) -> u64 {
        self.last_total_rx
    }

    /// 在 `first` 时刻开始采样
    pub fn start(self, sim: &mut Simulator, first: SimTime) {
        sim.schedule(first, ThroughputTick { sampler: self });
    }
}

/// 一次采样；执行后在 `now + interval` 重新调度自身
pub struct ThroughputTick {
    sampler: ThroughputSampler,
}

impl Event for ThroughputTick {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let ThroughputTick { mut sampler } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        let total = w.net.apps.total_rx(sampler.sink);
        let now = sim.now();
        let (delta, value) = sampler.tick(total);
        trace!(?now, total, delta, value, "📈 吞吐量采样");
        sampler.out.record(now, value);

        let next = now.saturating_add(sampler.interval);
        sim.schedule(next, ThroughputTick { sampler });
    }
}
