//! 拥塞状态订阅
//!
//! 把发送端 socket 的 `CongestionWindow` / `SlowStartThreshold` 变化写入输出：
//! 回调收到 `(旧值, 新值)`，丢弃旧值，以当前仿真时间记录新值。
//!
//! socket 在应用启动时才创建，所以订阅需要延后：
//! - `OnConnect`：注册连接建立钩子，在拥塞状态初始化之前挂接，初始值也会被记录
//! - `At(t)`：在固定时刻按路径挂接；那时 socket 还不存在则什么也不挂，
//!   对应序列为空，只记一条警告，实验继续

use tracing::{info, warn};

use super::emitter::SeriesHandle;
use super::traffic::Flow;
use crate::net::{NetWorld, Network, NodeId};
use crate::proto::tcp::{SocketRef, TcpStack};
use crate::proto::trace::{TraceCallback, TracePath, TraceSource};
use crate::sim::{Event, SimTime, Simulator, World};

/// 订阅时机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTime {
    OnConnect,
    At(SimTime),
}

#[derive(Debug, Clone, Copy)]
pub struct InstrumentationBinder {
    node: usize,
    socket: usize,
}

impl InstrumentationBinder {
    /// 目标：发送端节点上的第 0 个 socket
    pub fn for_flow(flow: &Flow) -> Self {
        Self {
            node: flow.src.0,
            socket: 0,
        }
    }

    pub fn path(&self, source: TraceSource) -> TracePath {
        TracePath::new(self.node, self.socket, source)
    }

    #[tracing::instrument(skip(self, net, sim, cwnd, ssthresh))]
    pub fn bind_congestion_metrics(
        &self,
        net: &mut Network,
        sim: &mut Simulator,
        when: BindTime,
        cwnd: SeriesHandle,
        ssthresh: SeriesHandle,
    ) {
        let binder = *self;
        match when {
            BindTime::OnConnect => {
                net.tcp.on_established(
                    NodeId(self.node),
                    Box::new(move |tcp: &mut TcpStack, sref: SocketRef| {
                        info!(node = ?sref.node, socket = sref.index, "🔗 连接建立，挂接拥塞状态订阅");
                        binder.attach(tcp, cwnd, ssthresh);
                    }),
                );
            }
            BindTime::At(at) => sim.schedule(
                at,
                BindTraces {
                    binder,
                    cwnd,
                    ssthresh,
                },
            ),
        }
    }

    /// 按路径挂接两个订阅，返回匹配到的对象数
    fn attach(&self, tcp: &mut TcpStack, cwnd: SeriesHandle, ssthresh: SeriesHandle) -> usize {
        let mut matched = 0;
        for (source, out) in [
            (TraceSource::CongestionWindow, cwnd),
            (TraceSource::SlowStartThreshold, ssthresh),
        ] {
            let path = self.path(source);
            let n = tcp.connect_trace(&path, emit_new_value(out));
            if n == 0 {
                warn!(%path, "订阅没有匹配到任何 socket，该序列将为空");
            }
            matched += n;
        }
        matched
    }
}

fn emit_new_value(out: SeriesHandle) -> TraceCallback<u32> {
    Box::new(move |now: SimTime, _old: u32, new: u32| out.record(now, new as f64))
}

/// 事件：在固定时刻挂接订阅
pub struct BindTraces {
    binder: InstrumentationBinder,
    cwnd: SeriesHandle,
    ssthresh: SeriesHandle,
}

impl Event for BindTraces {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let BindTraces {
            binder,
            cwnd,
            ssthresh,
        } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        let matched = binder.attach(&mut w.net.tcp, cwnd, ssthresh);
        info!(now = ?sim.now(), matched, "🔗 延迟订阅执行");
    }
}
