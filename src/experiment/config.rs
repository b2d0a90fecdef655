//! 实验配置
//!
//! `ExperimentConfig` 可从 JSON 反序列化；速率与时间均为带单位的字符串
//! （如 `"10Mbps"`、`"2ms"`）。示例：
//!
//! ```json
//! {
//!   "topology": { "kind": "wired", "link_rate_1": "10Mbps", "link_rate_2": "5Mbps",
//!                 "propagation_delay": "2ms" },
//!   "traffic": { "segment_size": 1000, "data_rate": "10Mbps", "duration_secs": 60 },
//!   "sampling": { "interval_ms": 100, "unit": "bps" }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::net::{DataRate, Position, PropagationLoss, WifiMode};
use crate::proto::tcp::{CongestionControl, TcpConfig};
use crate::sim::SimTime;

/// 点对点拓扑参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiredParams {
    /// client ↔ router
    pub link_rate_1: DataRate,
    /// router ↔ server
    pub link_rate_2: DataRate,
    pub propagation_delay: SimTime,
    /// 每个网卡的 DropTail 队列长度（包）
    pub queue_packets: u64,
}

impl Default for WiredParams {
    fn default() -> Self {
        Self {
            link_rate_1: DataRate::from_mbps(10),
            link_rate_2: DataRate::from_mbps(5),
            propagation_delay: SimTime::from_millis(2),
            queue_packets: 100,
        }
    }
}

/// 单小区无线拓扑参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WirelessParams {
    pub phy_data_mode: WifiMode,
    pub phy_control_mode: WifiMode,
    pub propagation_loss: PropagationLoss,
    /// 依次为 client、router(AP)、server 的位置
    pub positions: Vec<Position>,
    pub queue_packets: u64,
}

impl Default for WirelessParams {
    fn default() -> Self {
        Self {
            phy_data_mode: WifiMode::HtMcs3,
            phy_control_mode: WifiMode::HtMcs0,
            propagation_loss: PropagationLoss::default(),
            positions: vec![
                Position::on_line(0.0),
                Position::on_line(200.0),
                Position::on_line(400.0),
            ],
            queue_packets: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologyVariant {
    Wired(WiredParams),
    Wireless(WirelessParams),
}

impl TopologyVariant {
    pub fn name(&self) -> &'static str {
        match self {
            TopologyVariant::Wired(_) => "wired",
            TopologyVariant::Wireless(_) => "wireless",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub segment_size: u32,
    pub delayed_ack_count: u32,
    pub congestion_control: String,
    pub data_rate: DataRate,
    pub duration_secs: f64,
    pub port: u16,
    pub receiver_start: SimTime,
    pub sender_start: SimTime,
    pub on_time: SimTime,
    /// 为零表示源一直处于 on 状态
    pub off_time: SimTime,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            segment_size: 1000,
            delayed_ack_count: 2,
            congestion_control: "reno".to_string(),
            data_rate: DataRate::from_mbps(10),
            duration_secs: 60.0,
            port: 9,
            receiver_start: SimTime::ZERO,
            sender_start: SimTime::from_millis(1),
            on_time: SimTime::from_secs(1),
            off_time: SimTime::ZERO,
        }
    }
}

impl TrafficConfig {
    /// 实验结束时刻：应用停止与仿真停止共用
    pub fn horizon(&self) -> SimTime {
        SimTime::from_secs_f64(self.duration_secs)
    }
}

/// 吞吐量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThroughputUnit {
    #[default]
    Bps,
    Kbps,
    Mbps,
}

impl ThroughputUnit {
    pub fn scale(self) -> f64 {
        match self {
            ThroughputUnit::Bps => 1.0,
            ThroughputUnit::Kbps => 1e3,
            ThroughputUnit::Mbps => 1e6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    /// 第一次采样时刻
    pub start: SimTime,
    pub unit: ThroughputUnit,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            start: SimTime::from_millis(10),
            unit: ThroughputUnit::Bps,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> SimTime {
        SimTime::from_millis(self.interval_ms)
    }
}

/// 订阅拥塞状态的时机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BindStrategy {
    /// 连接建立时订阅（不会错过初始值）
    #[default]
    OnConnect,
    /// 固定延迟后订阅；此时 socket 尚不存在则对应序列为空。缺省延迟为实验时长的 1%
    Deferred {
        #[serde(default)]
        delay: Option<SimTime>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    pub bind: BindStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// 输出文件名前缀；缺省为拓扑名（`wired` / `wireless`）
    #[serde(default)]
    pub name: Option<String>,
    pub topology: TopologyVariant,
    #[serde(default)]
    pub traffic: TrafficConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub instrumentation: InstrumentationConfig,
    /// 引擎随机种子（无线帧错误、退避）
    #[serde(default)]
    pub seed: u64,
}

impl ExperimentConfig {
    /// 有线场景：10Mbps / 5Mbps，2ms，源速率 10Mbps，60s
    pub fn wired() -> Self {
        Self {
            name: None,
            topology: TopologyVariant::Wired(WiredParams::default()),
            traffic: TrafficConfig::default(),
            sampling: SamplingConfig::default(),
            instrumentation: InstrumentationConfig::default(),
            seed: 0,
        }
    }

    /// 无线场景：AP 居中，HtMcs3/HtMcs0，5GHz Friis，源速率 100Mbps，60s
    pub fn wireless() -> Self {
        Self {
            topology: TopologyVariant::Wireless(WirelessParams::default()),
            traffic: TrafficConfig {
                data_rate: DataRate::from_mbps(100),
                ..TrafficConfig::default()
            },
            ..Self::wired()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// 输出文件名前缀
    pub fn output_prefix(&self) -> &str {
        self.name.as_deref().unwrap_or(self.topology.name())
    }

    pub fn horizon(&self) -> SimTime {
        self.traffic.horizon()
    }

    /// 实际使用的订阅延迟（仅 `Deferred` 有意义）
    pub fn bind_delay(&self) -> Option<SimTime> {
        match self.instrumentation.bind {
            BindStrategy::OnConnect => None,
            BindStrategy::Deferred { delay } => {
                Some(delay.unwrap_or(SimTime(self.horizon().0 / 100)))
            }
        }
    }

    /// 引擎侧 TCP 参数
    pub fn tcp_config(&self) -> Result<TcpConfig, ConfigError> {
        let cc = CongestionControl::from_name(&self.traffic.congestion_control).ok_or_else(
            || ConfigError::UnknownCongestionControl(self.traffic.congestion_control.clone()),
        )?;
        Ok(TcpConfig {
            segment_size: self.traffic.segment_size,
            delayed_ack_count: self.traffic.delayed_ack_count,
            congestion_control: cc,
            ..TcpConfig::default()
        })
    }

    /// 在任何事件执行之前检查全部参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.traffic;
        let positive = |ok: bool, field: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::NotPositive { field })
            }
        };

        match &self.topology {
            TopologyVariant::Wired(w) => {
                positive(w.link_rate_1.bps() > 0, "link_rate_1")?;
                positive(w.link_rate_2.bps() > 0, "link_rate_2")?;
                positive(w.queue_packets > 0, "queue_packets")?;
            }
            TopologyVariant::Wireless(w) => {
                if w.positions.len() != 3 {
                    return Err(ConfigError::PositionCount {
                        expected: 3,
                        got: w.positions.len(),
                    });
                }
                positive(w.queue_packets > 0, "queue_packets")?;
                w.propagation_loss
                    .check()
                    .map_err(ConfigError::PropagationLoss)?;
            }
        }

        positive(t.segment_size > 0, "segment_size")?;
        positive(t.delayed_ack_count > 0, "delayed_ack_count")?;
        positive(t.data_rate.bps() > 0, "data_rate")?;
        positive(t.duration_secs.is_finite() && t.duration_secs > 0.0, "duration_secs")?;
        positive(t.on_time > SimTime::ZERO, "on_time")?;
        positive(self.sampling.interval_ms > 0, "interval_ms")?;
        self.tcp_config()?;

        let horizon = self.horizon();
        // 饱和到 MAX 的时长会让 run_until 永不返回
        if horizon == SimTime::MAX {
            return Err(ConfigError::DurationOutOfRange {
                secs: t.duration_secs,
            });
        }
        let before_horizon = |what: &'static str, at: SimTime| {
            if at < horizon {
                Ok(())
            } else {
                Err(ConfigError::AfterHorizon { what, at, horizon })
            }
        };
        before_horizon("receiver start", t.receiver_start)?;
        before_horizon("sender start", t.sender_start)?;
        before_horizon("first throughput sample", self.sampling.start)?;
        if let Some(delay) = self.bind_delay() {
            before_horizon("deferred trace binding", delay)?;
        }
        if t.receiver_start >= t.sender_start {
            return Err(ConfigError::StartOrder {
                receiver: t.receiver_start,
                sender: t.sender_start,
            });
        }
        Ok(())
    }
}
