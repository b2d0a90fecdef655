//! 可订阅的传输层内部状态
//!
//! - `Traced<T>`：值变化时按 `(旧值, 新值)` 回调所有订阅者
//! - `TracePath`：按路径寻址某个节点上某个 socket 的某个状态，
//!   文本形式为 `/NodeList/<n>/TcpL4Protocol/SocketList/<s>/<Source>`
//!
//! 订阅只会挂到订阅时已经存在的对象上；路径指向的 socket 尚不存在时，
//! 订阅不匹配任何对象（返回 0），由调用方决定如何处理。

use std::fmt;
use std::str::FromStr;

use crate::sim::SimTime;

/// 状态变化回调：`(当前仿真时间, 旧值, 新值)`
pub type TraceCallback<T> = Box<dyn FnMut(SimTime, T, T) + Send>;

/// 带订阅者的值
pub struct Traced<T> {
    value: T,
    sinks: Vec<TraceCallback<T>>,
}

impl<T: Copy + PartialEq> Traced<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            sinks: Vec::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    /// 更新值；只有值确实改变时才通知订阅者
    pub fn set(&mut self, now: SimTime, new: T) {
        let old = self.value;
        if old == new {
            return;
        }
        self.value = new;
        for sink in &mut self.sinks {
            sink(now, old, new);
        }
    }

    pub fn connect(&mut self, cb: TraceCallback<T>) {
        self.sinks.push(cb);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for Traced<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced")
            .field("value", &self.value)
            .field("subscribers", &self.sinks.len())
            .finish()
    }
}

/// TCP socket 上可订阅的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceSource {
    CongestionWindow,
    SlowStartThreshold,
}

impl TraceSource {
    pub fn name(self) -> &'static str {
        match self {
            TraceSource::CongestionWindow => "CongestionWindow",
            TraceSource::SlowStartThreshold => "SlowStartThreshold",
        }
    }
}

/// 状态路径：第 `node` 个节点上第 `socket` 个 TCP socket 的 `source`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TracePath {
    pub node: usize,
    pub socket: usize,
    pub source: TraceSource,
}

impl TracePath {
    pub fn new(node: usize, socket: usize, source: TraceSource) -> Self {
        Self {
            node,
            socket,
            source,
        }
    }
}

impl fmt::Display for TracePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/NodeList/{}/TcpL4Protocol/SocketList/{}/{}",
            self.node,
            self.socket,
            self.source.name()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TracePathError {
    #[error("trace path {0:?} does not match /NodeList/<n>/TcpL4Protocol/SocketList/<s>/<source>")]
    Malformed(String),
    #[error("invalid index {0:?} in trace path")]
    BadIndex(String),
    #[error("unknown trace source {0:?}")]
    UnknownSource(String),
}

impl FromStr for TracePath {
    type Err = TracePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().trim_start_matches('/').split('/').collect();
        let [node_list, node, l4, socket_list, socket, source] = parts.as_slice() else {
            return Err(TracePathError::Malformed(s.to_string()));
        };
        if *node_list != "NodeList" || *l4 != "TcpL4Protocol" || *socket_list != "SocketList" {
            return Err(TracePathError::Malformed(s.to_string()));
        }
        let node: usize = node
            .parse()
            .map_err(|_| TracePathError::BadIndex(node.to_string()))?;
        let socket: usize = socket
            .parse()
            .map_err(|_| TracePathError::BadIndex(socket.to_string()))?;
        let source = match *source {
            "CongestionWindow" => TraceSource::CongestionWindow,
            "SlowStartThreshold" => TraceSource::SlowStartThreshold,
            other => return Err(TracePathError::UnknownSource(other.to_string())),
        };
        Ok(TracePath::new(node, socket, source))
    }
}
