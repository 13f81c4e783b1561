pub mod time;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 交易标的代码，统一规范化为大写形式。
///
/// # Invariants
/// - 非空，且仅包含 ASCII 字母数字以及 `-`、`.`、`/`。
/// - 不含 `_`，因此可以安全地用作缓存 Key 的分隔符。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// # Summary
    /// 解析并规范化交易代码。
    ///
    /// # Logic
    /// 1. 去除首尾空白并转为大写。
    /// 2. 校验非空与字符集合法性。
    ///
    /// # Arguments
    /// * `raw`: 调用方传入的原始代码，例如 ` btc `。
    ///
    /// # Returns
    /// 成功返回 `Symbol`，失败返回错误描述。
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err("Symbol must not be empty".to_string());
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '/')))
        {
            return Err(format!("Symbol '{}' contains invalid character '{}'", raw, bad));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// # Summary
/// K 线周期枚举，定义单根 K 线的时间跨度。
///
/// # Invariants
/// - 集合封闭：仅支持 1m、5m、15m、1h、4h、1d。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Interval {
    // 1分钟
    Minute1,
    // 5分钟
    Minute5,
    // 15分钟
    Minute15,
    // 1小时
    Hour1,
    // 4小时
    Hour4,
    // 1日
    Day1,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::Minute1,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Hour1,
        Interval::Hour4,
        Interval::Day1,
    ];

    /// 周期对应的分钟数。
    pub fn minutes(self) -> i64 {
        match self {
            Interval::Minute1 => 1,
            Interval::Minute5 => 5,
            Interval::Minute15 => 15,
            Interval::Hour1 => 60,
            Interval::Hour4 => 240,
            Interval::Day1 => 1440,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "minute1" => Ok(Interval::Minute1),
            "5m" | "minute5" => Ok(Interval::Minute5),
            "15m" | "minute15" => Ok(Interval::Minute15),
            "1h" | "60m" | "hour1" => Ok(Interval::Hour1),
            "4h" | "240m" | "hour4" => Ok(Interval::Hour4),
            "1d" | "24h" | "day1" => Ok(Interval::Day1),
            _ => Err(format!(
                "Unknown interval: {}. Supported: 1m, 5m, 15m, 1h, 4h, 1d",
                s
            )),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(Symbol::parse("  btc ").unwrap().as_str(), "BTC");
        assert_eq!(Symbol::parse("eth/usdt").unwrap().as_str(), "ETH/USDT");
        assert!(Symbol::parse("   ").is_err());
        assert!(Symbol::parse("BTC_USD").is_err());
    }

    #[test]
    fn test_interval_round_trip_text() {
        for interval in Interval::ALL {
            let parsed: Interval = interval.to_string().parse().unwrap();
            assert_eq!(parsed, interval);
        }
        assert_eq!("60M".parse::<Interval>().unwrap(), Interval::Hour1);
        assert!("2h".parse::<Interval>().is_err());
    }
}
