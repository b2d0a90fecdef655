//! 数据速率
//!
//! `DataRate` 以 bit/s 存储，可从 `"10Mbps"`、`"5Mb/s"`、`"500kbps"` 等文本解析。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::sim::SimTime;

/// 数据速率（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate(u64);

/// 速率文本解析错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RateParseError {
    #[error("empty data rate")]
    Empty,
    #[error("invalid number in data rate {0:?}")]
    InvalidNumber(String),
    #[error("unknown data rate unit {unit:?} (expected bps, kbps, Mbps or Gbps)")]
    UnknownUnit { unit: String },
    #[error("data rate must be positive, got {0:?}")]
    NotPositive(String),
}

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self(bps)
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self(mbps.saturating_mul(1_000_000))
    }

    pub fn bps(self) -> u64 {
        self.0
    }

    /// 以该速率串行发送 `bytes` 字节所需时间（向上取整到纳秒）。
    pub fn tx_time(self, bytes: u64) -> SimTime {
        if self.0 == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (self.0 as u128 - 1)) / self.0 as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl FromStr for DataRate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RateParseError::Empty);
        }
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| RateParseError::InvalidNumber(s.to_string()))?;
        if !value.is_finite() {
            return Err(RateParseError::InvalidNumber(s.to_string()));
        }
        let scale = match unit.trim() {
            "" | "bps" | "b/s" => 1.0,
            "kbps" | "Kbps" | "kb/s" | "Kb/s" => 1e3,
            "Mbps" | "mbps" | "Mb/s" => 1e6,
            "Gbps" | "gbps" | "Gb/s" => 1e9,
            other => {
                return Err(RateParseError::UnknownUnit {
                    unit: other.to_string(),
                });
            }
        };
        let bps = (value * scale).round();
        if bps < 1.0 {
            return Err(RateParseError::NotPositive(s.to_string()));
        }
        Ok(DataRate(bps.min(u64::MAX as f64) as u64))
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps != 0 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps != 0 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps != 0 && bps % 1_000 == 0 {
            write!(f, "{}kbps", bps / 1_000)
        } else {
            write!(f, "{bps}bps")
        }
    }
}

impl TryFrom<String> for DataRate {
    type Error = RateParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DataRate> for String {
    fn from(r: DataRate) -> Self {
        r.to_string()
    }
}
