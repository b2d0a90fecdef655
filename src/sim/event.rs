//! 事件与世界
//!
//! 调度器只认识这两个 trait：事件在某个时刻被取出执行，执行时拿到整个世界的可变引用。

use std::any::Any;

use super::simulator::Simulator;

/// 被调度的动作。`self: Box<Self>` 让周期性事件（采样器、应用发送）
/// 可以把自己的状态整体搬进下一次调度。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 仿真世界：网络、协议栈、应用都挂在它下面；事件里通过 `as_any_mut` 向下转型取回具体类型
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// 每执行完一个事件调用一次
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
