//! Helpers for accessing the TCP stack from the simulation world.

use crate::proto::tcp::TcpStack;
use crate::sim::World;

use super::{NetWorld, Network};

/// 暂时把 `TcpStack` 从网络中取出，使闭包能同时拿到 `&mut Network` 与 `&mut TcpStack`。
pub(crate) fn with_tcp_stack<F, R>(world: &mut dyn World, f: F) -> R
where
    F: FnOnce(&mut Network, &mut TcpStack) -> R,
{
    let w = world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld");
    with_net_tcp(&mut w.net, f)
}

pub(crate) fn with_net_tcp<F, R>(net: &mut Network, f: F) -> R
where
    F: FnOnce(&mut Network, &mut TcpStack) -> R,
{
    let mut tcp = std::mem::take(&mut net.tcp);
    let result = f(net, &mut tcp);
    net.tcp = tcp;
    result
}
