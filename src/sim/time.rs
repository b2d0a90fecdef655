//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换、文本解析（如 `"2ms"`）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    pub fn from_nanos(ns: u64) -> SimTime {
        SimTime(ns)
    }
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    /// 从浮点秒数构造；负数与 NaN 视为 0，超出范围饱和。
    pub fn from_secs_f64(s: f64) -> SimTime {
        if !(s > 0.0) {
            return SimTime::ZERO;
        }
        let ns = (s * 1e9).round();
        if ns >= u64::MAX as f64 {
            SimTime::MAX
        } else {
            SimTime(ns as u64)
        }
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn saturating_add(self, d: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(d.0))
    }

    pub fn saturating_sub(self, d: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(d.0))
    }
}

/// 时间文本解析错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeParseError {
    #[error("empty time value")]
    Empty,
    #[error("invalid number in time value {0:?}")]
    InvalidNumber(String),
    #[error("unknown time unit {unit:?} (expected ns, us, ms or s)")]
    UnknownUnit { unit: String },
    #[error("time value must be non-negative, got {0:?}")]
    Negative(String),
}

impl FromStr for SimTime {
    type Err = TimeParseError;

    /// 解析形如 `"2ms"`、`"0.01s"`、`"150us"`、`"7ns"` 的时间；缺省单位为秒。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimeParseError::Empty);
        }
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .trim()
            .parse()
            .map_err(|_| TimeParseError::InvalidNumber(s.to_string()))?;
        if !value.is_finite() {
            return Err(TimeParseError::InvalidNumber(s.to_string()));
        }
        if value < 0.0 {
            return Err(TimeParseError::Negative(s.to_string()));
        }
        let scale = match unit.trim() {
            "ns" => 1.0,
            "us" => 1e3,
            "ms" => 1e6,
            "s" | "" => 1e9,
            other => {
                return Err(TimeParseError::UnknownUnit {
                    unit: other.to_string(),
                });
            }
        };
        let ns = (value * scale).round();
        if ns >= u64::MAX as f64 {
            return Ok(SimTime::MAX);
        }
        Ok(SimTime(ns as u64))
    }
}

impl fmt::Display for SimTime {
    /// 选择能整除的最大单位输出，保证 `parse(display(t)) == t`。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0;
        if ns == 0 {
            return write!(f, "0s");
        }
        if ns % 1_000_000_000 == 0 {
            write!(f, "{}s", ns / 1_000_000_000)
        } else if ns % 1_000_000 == 0 {
            write!(f, "{}ms", ns / 1_000_000)
        } else if ns % 1_000 == 0 {
            write!(f, "{}us", ns / 1_000)
        } else {
            write!(f, "{ns}ns")
        }
    }
}

impl TryFrom<String> for SimTime {
    type Error = TimeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SimTime> for String {
    fn from(t: SimTime) -> Self {
        t.to_string()
    }
}
