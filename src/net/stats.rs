//! 统计信息
//!
//! 定义网络仿真统计数据结构。

/// 网络统计信息
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    /// 设备队列溢出（DropTail）丢包
    pub dropped_pkts: u64,
    /// 无线帧重传次数耗尽导致的丢包
    pub wifi_lost_pkts: u64,
    /// 无线帧错误（每次失败的发送尝试计一次）
    pub wifi_frame_errors: u64,
}
