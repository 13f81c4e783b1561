use crate::common::{Interval, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// # Summary
/// 单根 K 线数据实体，记录特定周期内的行情波动。
///
/// # Invariants
/// - `timestamp` 为秒级 Unix 时间戳。
/// - `low <= open, close <= high`，违反时视为数据源错误。
/// - 价格与成交量均不为负。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间（秒）
    pub timestamp: i64,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量（基础资产计）
    pub volume: f64,
}

impl Candle {
    /// 四个价格完全相同的 K 线（通常来自停滞或流动性极差的行情）。
    pub fn is_flat(&self) -> bool {
        self.open == self.high && self.high == self.low && self.low == self.close
    }

    /// 检查 OHLC 不变式。
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }

    /// 四个价格与成交量均为非负数（NaN 不通过）。
    pub fn is_non_negative(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| *v >= 0.0)
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// # Summary
/// 数据源返回的原始 K 线记录，字段可能是字符串或数字。
///
/// # Invariants
/// - 缺失字段反序列化为 `Value::Null`，由归一化阶段统一降级为 0。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    #[serde(default)]
    pub o: Value,
    #[serde(default)]
    pub h: Value,
    #[serde(default)]
    pub l: Value,
    #[serde(default)]
    pub c: Value,
    #[serde(default)]
    pub v: Value,
    #[serde(default)]
    pub t: Value,
}

/// # Summary
/// 单个标的、单个周期下按时间升序排列的定长 K 线窗口。
///
/// # Invariants
/// - `candles` 严格按 `timestamp` 升序。
/// - 构造后不可变；新一次抓取生成新的窗口而不是修改旧窗口。
/// - 数量可能少于目标窗口大小，但绝不补齐合成数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleWindow {
    pub symbol: Symbol,
    pub interval: Interval,
    pub candles: Vec<Candle>,
    // 最新收盘价
    pub latest_price: f64,
    // 最新收盘价相对首根开盘价的变化
    pub price_change: f64,
    pub price_change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub total_volume: f64,
    pub generated_at: DateTime<Utc>,
}

impl CandleWindow {
    /// # Summary
    /// 基于已排序的 K 线构造窗口并计算汇总统计。
    ///
    /// # Logic
    /// 1. 最新价取最后一根收盘价，涨跌幅相对首根开盘价计算。
    /// 2. 首根开盘价为 0 时涨跌幅记为 0，避免除零。
    /// 3. 空序列的所有统计量均为 0。
    ///
    /// # Arguments
    /// * `symbol`: 标的代码。
    /// * `interval`: K 线周期。
    /// * `candles`: 已升序排列的 K 线。
    /// * `generated_at`: 窗口生成时间。
    ///
    /// # Returns
    /// 不可变的 `CandleWindow`。
    pub fn new(
        symbol: Symbol,
        interval: Interval,
        candles: Vec<Candle>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let (first_open, latest_price) = match (candles.first(), candles.last()) {
            (Some(first), Some(last)) => (first.open, last.close),
            _ => (0.0, 0.0),
        };
        let price_change = latest_price - first_open;
        let price_change_percent = if first_open > 0.0 {
            price_change / first_open * 100.0
        } else {
            0.0
        };
        let high = candles.iter().map(|c| c.high).fold(None, |acc: Option<f64>, h| {
            Some(acc.map_or(h, |a| a.max(h)))
        });
        let low = candles.iter().map(|c| c.low).fold(None, |acc: Option<f64>, l| {
            Some(acc.map_or(l, |a| a.min(l)))
        });
        let total_volume = candles.iter().map(|c| c.volume).sum();

        Self {
            symbol,
            interval,
            candles,
            latest_price,
            price_change,
            price_change_percent,
            high: high.unwrap_or(0.0),
            low: low.unwrap_or(0.0),
            total_volume,
            generated_at,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}
