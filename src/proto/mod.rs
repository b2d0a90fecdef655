//! 传输层/协议模块
//!
//! 包含 TCP 的简化实现（用于仿真实验）以及可订阅的内部状态。

pub mod tcp;
pub mod trace;

pub use tcp::{
    CongestionControl, EstablishedHook, SocketRef, TcpConfig, TcpConn, TcpConnId, TcpStack,
    TcpState,
};
pub use trace::{TraceCallback, TracePath, TracePathError, TraceSource, Traced};
// Transport tag types live in `net::transport`.
