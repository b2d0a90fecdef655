//! IPv4 地址分配
//!
//! `AddressHelper` 在一个子网内按调用顺序为设备分配主机地址：
//! 第一个设备得到 `.1`，第二个 `.2`，依此类推。分配顺序完全由调用顺序决定，
//! 后续组件可以据此稳定地引用端点地址。

use std::net::Ipv4Addr;

use super::id::{DeviceId, NodeId};
use super::network::Network;

/// 节点上的一个 IPv4 接口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    pub node: NodeId,
    pub device: DeviceId,
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl Interface {
    /// 接口所在子网的网络地址
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & prefix_mask(self.prefix_len))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid prefix length /{0} (expected 1..=30)")]
    InvalidPrefix(u8),
    #[error("{base}/{prefix_len} is not a network address")]
    NotNetworkAddress { base: Ipv4Addr, prefix_len: u8 },
    #[error("subnet {base}/{prefix_len} has no free host addresses left")]
    SubnetExhausted { base: Ipv4Addr, prefix_len: u8 },
    #[error("device {0:?} does not exist")]
    UnknownDevice(DeviceId),
    #[error("device {device:?} already has address {addr}")]
    AlreadyAssigned { device: DeviceId, addr: Ipv4Addr },
}

pub(crate) fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len as u32)
    }
}

/// 子网内的顺序地址分配器
#[derive(Debug, Clone)]
pub struct AddressHelper {
    base: Ipv4Addr,
    prefix_len: u8,
    next_host: u32,
}

impl AddressHelper {
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Result<Self, AddressError> {
        if !(1..=30).contains(&prefix_len) {
            return Err(AddressError::InvalidPrefix(prefix_len));
        }
        if u32::from(base) & !prefix_mask(prefix_len) != 0 {
            return Err(AddressError::NotNetworkAddress { base, prefix_len });
        }
        Ok(Self {
            base,
            prefix_len,
            next_host: 1,
        })
    }

    /// 取下一个主机地址（不含网络地址与广播地址）
    pub fn next_address(&mut self) -> Result<Ipv4Addr, AddressError> {
        let host_bits = 32 - self.prefix_len as u32;
        let max_host = (1u32 << host_bits) - 2;
        if self.next_host > max_host {
            return Err(AddressError::SubnetExhausted {
                base: self.base,
                prefix_len: self.prefix_len,
            });
        }
        let addr = Ipv4Addr::from(u32::from(self.base) | self.next_host);
        self.next_host += 1;
        Ok(addr)
    }

    /// 按顺序为一组设备分配地址，返回与 `devices` 一一对应的接口。
    pub fn assign(
        &mut self,
        net: &mut Network,
        devices: &[DeviceId],
    ) -> Result<Vec<Interface>, AddressError> {
        let mut out = Vec::with_capacity(devices.len());
        for &device in devices {
            let addr = self.next_address()?;
            out.push(net.assign_address(device, addr, self.prefix_len)?);
        }
        Ok(out)
    }
}
