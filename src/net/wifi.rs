//! 单小区无线信道模型
//!
//! 极简 802.11n 模型：
//! - 共享介质：整个信道一个 `busy_until`，任一时刻只有一个帧在空中
//! - 固定 PHY 速率（数据帧 / 控制帧各一个 HT MCS，无速率自适应）
//! - 随机退避：DIFS + U[0, CWmin] 个时隙，退避抽样来自网络的种子 RNG
//! - 距离相关的传播损耗 → 接收功率 → SNR → 帧错误概率
//! - MAC 层重传，最多 `MAX_RETRIES` 次
//!
//! 站点（STA）之间不直接通信，所有流量经接入点（AP）中转。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::id::{ChannelId, DeviceId, NodeId};
use super::packet::Packet;
use super::rate::DataRate;
use crate::queue::DropTailQueue;
use crate::sim::SimTime;

pub const SLOT: SimTime = SimTime(9_000);
pub const SIFS: SimTime = SimTime(16_000);
pub const DIFS: SimTime = SimTime(34_000);
/// HT-mixed 前导 + PLCP 头（20MHz）
pub const PREAMBLE: SimTime = SimTime(36_000);
pub const CW_MIN: u32 = 15;
/// MAC 头 + LLC/SNAP + FCS
pub const MAC_OVERHEAD_BYTES: u32 = 36;
pub const ACK_FRAME_BYTES: u32 = 14;
pub const MAX_RETRIES: u32 = 7;
/// 帧错误率曲线在阈值附近的斜率（每 dB）
const PER_SLOPE_PER_DB: f64 = 2.0;
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// HT（802.11n，单流，20MHz，长 GI）调制编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WifiMode {
    HtMcs0,
    HtMcs1,
    HtMcs2,
    HtMcs3,
    HtMcs4,
    HtMcs5,
    HtMcs6,
    HtMcs7,
}

impl WifiMode {
    const ALL: [WifiMode; 8] = [
        WifiMode::HtMcs0,
        WifiMode::HtMcs1,
        WifiMode::HtMcs2,
        WifiMode::HtMcs3,
        WifiMode::HtMcs4,
        WifiMode::HtMcs5,
        WifiMode::HtMcs6,
        WifiMode::HtMcs7,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        ["HtMcs0", "HtMcs1", "HtMcs2", "HtMcs3", "HtMcs4", "HtMcs5", "HtMcs6", "HtMcs7"][self.index()]
    }

    /// PHY 速率
    pub fn data_rate(self) -> DataRate {
        const KBPS: [u64; 8] = [6_500, 13_000, 19_500, 26_000, 39_000, 52_000, 58_500, 65_000];
        DataRate::from_bps(KBPS[self.index()] * 1_000)
    }

    /// 帧错误率为 50% 时的 SNR（dB）
    pub fn snr_threshold_db(self) -> f64 {
        const DB: [f64; 8] = [2.0, 5.0, 9.0, 11.0, 15.0, 18.0, 20.0, 25.0];
        DB[self.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wifi mode {0:?} (expected HtMcs0..HtMcs7)")]
pub struct WifiModeParseError(String);

impl FromStr for WifiMode {
    type Err = WifiModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WifiMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WifiModeParseError(s.to_string()))
    }
}

impl fmt::Display for WifiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for WifiMode {
    type Error = WifiModeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WifiMode> for String {
    fn from(m: WifiMode) -> Self {
        m.name().to_string()
    }
}

/// 固定位置（米）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub const fn on_line(x: f64) -> Self {
        Self { x, y: 0.0, z: 0.0 }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// 传播损耗模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropagationLoss {
    /// 自由空间（Friis）
    Friis {
        frequency_hz: f64,
        #[serde(default)]
        system_loss_db: f64,
    },
    /// 对数距离：`L(d) = L0 + 10 n log10(d / d0)`
    LogDistance {
        exponent: f64,
        reference_distance_m: f64,
        reference_loss_db: f64,
    },
}

impl Default for PropagationLoss {
    fn default() -> Self {
        PropagationLoss::Friis {
            frequency_hz: 5e9,
            system_loss_db: 0.0,
        }
    }
}

impl PropagationLoss {
    /// 距离 `distance_m` 处的路径损耗（dB，非负）
    pub fn loss_db(&self, distance_m: f64) -> f64 {
        match *self {
            PropagationLoss::Friis {
                frequency_hz,
                system_loss_db,
            } => {
                let lambda = SPEED_OF_LIGHT / frequency_hz;
                // 近场内不再衰减
                let d = distance_m.max(lambda);
                let fspl = 20.0 * (4.0 * std::f64::consts::PI * d / lambda).log10();
                (fspl + system_loss_db).max(0.0)
            }
            PropagationLoss::LogDistance {
                exponent,
                reference_distance_m,
                reference_loss_db,
            } => {
                if distance_m <= reference_distance_m {
                    return reference_loss_db.max(0.0);
                }
                (reference_loss_db
                    + 10.0 * exponent * (distance_m / reference_distance_m).log10())
                .max(0.0)
            }
        }
    }

    /// 参数是否物理上有意义；返回问题描述
    pub fn check(&self) -> Result<(), String> {
        match *self {
            PropagationLoss::Friis { frequency_hz, .. } => {
                if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
                    return Err(format!("friis frequency must be positive, got {frequency_hz}"));
                }
            }
            PropagationLoss::LogDistance {
                exponent,
                reference_distance_m,
                reference_loss_db,
            } => {
                if !(exponent.is_finite() && exponent > 0.0) {
                    return Err(format!("log-distance exponent must be positive, got {exponent}"));
                }
                if !(reference_distance_m.is_finite() && reference_distance_m > 0.0) {
                    return Err(format!(
                        "log-distance reference distance must be positive, got {reference_distance_m}"
                    ));
                }
                if !reference_loss_db.is_finite() {
                    return Err("log-distance reference loss must be finite".to_string());
                }
            }
        }
        Ok(())
    }
}

/// PHY 参数
#[derive(Debug, Clone, PartialEq)]
pub struct WifiPhyConfig {
    pub data_mode: WifiMode,
    pub control_mode: WifiMode,
    pub tx_power_dbm: f64,
    pub noise_figure_db: f64,
    pub channel_width_hz: f64,
    pub loss: PropagationLoss,
}

impl Default for WifiPhyConfig {
    fn default() -> Self {
        Self {
            data_mode: WifiMode::HtMcs3,
            control_mode: WifiMode::HtMcs0,
            tx_power_dbm: 16.0206,
            noise_figure_db: 7.0,
            channel_width_hz: 20e6,
            loss: PropagationLoss::default(),
        }
    }
}

impl WifiPhyConfig {
    /// 热噪声 + 噪声系数（dBm）
    pub fn noise_dbm(&self) -> f64 {
        -174.0 + 10.0 * self.channel_width_hz.log10() + self.noise_figure_db
    }

    pub fn snr_db(&self, distance_m: f64) -> f64 {
        self.tx_power_dbm - self.loss.loss_db(distance_m) - self.noise_dbm()
    }

    /// 以数据模式发送时的单帧错误概率
    pub fn frame_error_prob(&self, distance_m: f64) -> f64 {
        let margin = self.snr_db(distance_m) - self.data_mode.snr_threshold_db();
        1.0 / (1.0 + (PER_SLOPE_PER_DB * margin).exp())
    }

    /// 数据帧在空中的时间（前导 + MAC 帧）
    pub fn data_airtime(&self, net_bytes: u32) -> SimTime {
        let bytes = net_bytes.saturating_add(MAC_OVERHEAD_BYTES) as u64;
        PREAMBLE.saturating_add(self.data_mode.data_rate().tx_time(bytes))
    }

    /// 一次完整的数据帧交换占用介质的时间：DATA + SIFS + ACK
    pub fn exchange_time(&self, net_bytes: u32) -> SimTime {
        let ack = PREAMBLE.saturating_add(
            self.control_mode
                .data_rate()
                .tx_time(ACK_FRAME_BYTES as u64),
        );
        self.data_airtime(net_bytes)
            .saturating_add(SIFS)
            .saturating_add(ack)
    }
}

/// 传播时延（光速）
pub fn propagation_delay(distance_m: f64) -> SimTime {
    SimTime::from_secs_f64(distance_m / SPEED_OF_LIGHT)
}

/// MAC 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiRole {
    AccessPoint,
    Station,
}

/// 共享无线信道
#[derive(Debug)]
pub struct WifiChannel {
    pub id: ChannelId,
    pub phy: WifiPhyConfig,
    pub busy_until: SimTime,
    pub devices: Vec<DeviceId>,
}

impl WifiChannel {
    pub fn new(id: ChannelId, phy: WifiPhyConfig) -> Self {
        Self {
            id,
            phy,
            busy_until: SimTime::ZERO,
            devices: Vec::new(),
        }
    }
}

/// 无线网卡：发送队列 + 正在重传的帧
#[derive(Debug)]
pub struct WifiDevice {
    pub node: NodeId,
    pub channel: ChannelId,
    pub role: WifiRole,
    pub position: Position,
    pub queue: DropTailQueue,
    /// 队头帧（已出队、等待信道或重传中）及已失败次数
    pub head: Option<(Packet, u32)>,
    /// 已有一个 `WifiAccess` 事件在途
    pub access_pending: bool,
}
