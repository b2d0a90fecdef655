//! 仿真核心模块
//!
//! 单线程离散事件调度：纳秒仿真时间、事件、世界与调度器。

// 子模块声明
mod event;
mod scheduled_event;
mod simulator;
mod time;

// 重新导出公共接口
pub use event::{Event, World};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::{SimTime, TimeParseError};
