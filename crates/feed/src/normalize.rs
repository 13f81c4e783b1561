use candela_core::common::time::TimeProvider;
use candela_core::common::{Interval, Symbol};
use candela_core::market::entity::{Candle, CandleWindow, RawCandle};
use candela_core::market::error::MarketError;
use candela_core::market::port::MarketDataProvider;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// 不小于该值的时间戳视为毫秒。
pub const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// # Summary
/// 将字符串或数字形式的字段转换为 f64。
///
/// # Logic
/// 1. JSON 数字直接取值。
/// 2. 字符串先剔除除数字、`.` 与前导 `-` 之外的所有字符，再解析。
/// 3. 其余类型或无法解析的内容一律降级为 `0.0`，不使整次抓取失败。
///
/// # Arguments
/// * `value`: 原始 JSON 字段。
///
/// # Returns
/// 有限的 f64 数值。
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => strip_numeric(s).parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// # Summary
/// 将时间戳字段转换为秒级 Unix 时间戳。
///
/// # Logic
/// 1. 优先按整数读取以避免精度损失，否则按浮点数截断。
/// 2. 大于等于 10^12 的值视为毫秒并除以 1000。
///
/// # Arguments
/// * `value`: 原始 JSON 字段。
///
/// # Returns
/// 秒级时间戳，无法解析时为 0。
pub fn coerce_timestamp(value: &Value) -> i64 {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_secs)),
        Value::String(s) => {
            let cleaned = strip_numeric(s);
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().and_then(float_to_secs))
        }
        _ => None,
    }
    .unwrap_or(0);

    if raw >= MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    }
}

// i64 可精确表示的浮点上界为 2^63，超出范围返回 None
const F64_I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

#[allow(
    clippy::cast_possible_truncation,
    reason = "finite and range-checked against i64 bounds before the cast"
)]
fn float_to_secs(v: f64) -> Option<i64> {
    let v = v.trunc();
    if v.is_finite() && (-F64_I64_BOUND..F64_I64_BOUND).contains(&v) {
        Some(v as i64)
    } else {
        None
    }
}

/// 仅保留数字、小数点与首位负号。
fn strip_numeric(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.trim().chars() {
        if ch.is_ascii_digit() || ch == '.' || (ch == '-' && out.is_empty()) {
            out.push(ch);
        }
    }
    out
}

/// 将单条原始记录转换为规范 K 线（不做不变式校验）。
pub fn normalize_record(raw: &RawCandle) -> Candle {
    Candle {
        timestamp: coerce_timestamp(&raw.t),
        open: coerce_number(&raw.o),
        high: coerce_number(&raw.h),
        low: coerce_number(&raw.l),
        close: coerce_number(&raw.c),
        volume: coerce_number(&raw.v),
    }
}

/// # Summary
/// 将原始记录归一化为定长、升序的 K 线窗口。纯函数。
///
/// # Logic
/// 1. 校验目标数量，空记录直接返回 `NoData`。
/// 2. 逐条转换并校验 OHLC 不变式、非负价格与成交量、可表示的时间戳，
///    违反者以 `InvalidCandle` 上报而不是修复。
/// 3. 按时间升序稳定排序。
/// 4. 超出目标数量时仅保留最近的 `target` 根；不足时全部保留。
///
/// # Arguments
/// * `symbol`: 标的代码。
/// * `interval`: K 线周期。
/// * `raw`: 数据源返回的原始记录。
/// * `target`: 目标窗口大小。
/// * `generated_at`: 窗口生成时间。
///
/// # Returns
/// 成功返回 `CandleWindow`。
pub fn normalize(
    symbol: &Symbol,
    interval: Interval,
    raw: &[RawCandle],
    target: usize,
    generated_at: DateTime<Utc>,
) -> Result<CandleWindow, MarketError> {
    if target == 0 {
        return Err(MarketError::InvalidInput(
            "target count must be greater than zero".to_string(),
        ));
    }
    if raw.is_empty() {
        return Err(MarketError::NoData(format!("{} {}", symbol, interval)));
    }

    let mut candles = Vec::with_capacity(raw.len());
    for record in raw {
        let candle = normalize_record(record);
        if !candle.is_consistent() {
            return Err(MarketError::InvalidCandle(format!(
                "{} {} at {}: o={} h={} l={} c={}",
                symbol,
                interval,
                candle.timestamp,
                candle.open,
                candle.high,
                candle.low,
                candle.close
            )));
        }
        if !candle.is_non_negative() {
            return Err(MarketError::InvalidCandle(format!(
                "{} {} at {}: negative value o={} h={} l={} c={} v={}",
                symbol,
                interval,
                candle.timestamp,
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume
            )));
        }
        if candle.time().is_none() {
            return Err(MarketError::InvalidCandle(format!(
                "{} {}: timestamp {} is out of range",
                symbol, interval, candle.timestamp
            )));
        }
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.timestamp);
    if candles.len() > target {
        let excess = candles.len() - target;
        candles.drain(..excess);
    }

    Ok(CandleWindow::new(
        symbol.clone(),
        interval,
        candles,
        generated_at,
    ))
}

/// # Summary
/// K 线归一化器：向数据源请求固定窗口并产出规范窗口。
///
/// # Invariants
/// - 除数据源网络调用外无副作用。
pub struct CandleNormalizer {
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn TimeProvider>,
}

impl CandleNormalizer {
    pub fn new(provider: Arc<dyn MarketDataProvider>, clock: Arc<dyn TimeProvider>) -> Self {
        Self { provider, clock }
    }

    /// # Summary
    /// 抓取并归一化一个 K 线窗口。
    ///
    /// # Logic
    /// 1. 校验目标数量。
    /// 2. 向数据源请求 `target_count` 根原始记录。
    /// 3. 调用 `normalize` 完成转换、排序与截断。
    ///
    /// # Arguments
    /// * `symbol`: 规范化后的标的代码。
    /// * `interval`: K 线周期。
    /// * `target_count`: 目标窗口大小。
    ///
    /// # Returns
    /// 成功返回 `CandleWindow`，失败返回 `MarketError`。
    pub async fn fetch(
        &self,
        symbol: &Symbol,
        interval: Interval,
        target_count: usize,
    ) -> Result<CandleWindow, MarketError> {
        if target_count == 0 {
            return Err(MarketError::InvalidInput(
                "target count must be greater than zero".to_string(),
            ));
        }

        let raw = self
            .provider
            .fetch_raw(symbol, interval, target_count)
            .await?;
        debug!(
            "Normalizer: provider returned {} records for {} {}",
            raw.len(),
            symbol,
            interval
        );

        normalize(symbol, interval, &raw, target_count, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(t: Value, o: Value, h: Value, l: Value, c: Value, v: Value) -> RawCandle {
        RawCandle { o, h, l, c, v, t }
    }

    fn simple(ts: i64, price: f64) -> RawCandle {
        raw(
            json!(ts),
            json!(price),
            json!(price + 1.0),
            json!(price - 1.0),
            json!(price + 0.5),
            json!(10.0),
        )
    }

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn btc() -> Symbol {
        Symbol::parse("BTC").unwrap()
    }

    #[test]
    fn test_coerce_number_variants() {
        assert_eq!(coerce_number(&json!(42.5)), 42.5);
        assert_eq!(coerce_number(&json!("42.5")), 42.5);
        assert_eq!(coerce_number(&json!("$1,234.50")), 1234.5);
        assert_eq!(coerce_number(&json!(" -3.25 ")), -3.25);
        assert_eq!(coerce_number(&json!("1-2")), 12.0);
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&json!("1.2.3")), 0.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
        assert_eq!(coerce_number(&json!(true)), 0.0);
        assert_eq!(coerce_number(&json!([1])), 0.0);
    }

    #[test]
    fn test_coerce_timestamp_units() {
        assert_eq!(coerce_timestamp(&json!(1_700_000_000)), 1_700_000_000);
        assert_eq!(coerce_timestamp(&json!(1_700_000_000_123_i64)), 1_700_000_000);
        assert_eq!(coerce_timestamp(&json!("1700000000000")), 1_700_000_000);
        assert_eq!(coerce_timestamp(&json!(1_700_000_000.9)), 1_700_000_000);
        assert_eq!(coerce_timestamp(&json!(999_999_999_999_i64)), 999_999_999_999);
        assert_eq!(coerce_timestamp(&json!("garbage")), 0);
    }

    #[test]
    fn test_normalize_sorts_and_trims_to_most_recent() {
        let records: Vec<RawCandle> = (0..30)
            .rev()
            .map(|i: i32| simple(1_700_000_000 + i64::from(i) * 3600, 100.0 + f64::from(i)))
            .collect();

        let window = normalize(&btc(), Interval::Hour1, &records, 20, at()).unwrap();
        assert_eq!(window.len(), 20);
        assert!(window.candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(window.candles[0].timestamp, 1_700_000_000 + 10 * 3600);
        assert_eq!(window.candles[19].timestamp, 1_700_000_000 + 29 * 3600);
    }

    #[test]
    fn test_normalize_keeps_short_window() {
        let records: Vec<RawCandle> = (0..5).map(|i| simple(i * 3600, 50.0)).collect();
        let window = normalize(&btc(), Interval::Hour1, &records, 20, at()).unwrap();
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let records = vec![
            raw(
                json!("1700003600000"),
                json!("101"),
                json!(105),
                json!("99.5"),
                json!(102.25),
                json!("7"),
            ),
            simple(1_700_000_000, 100.0),
        ];
        let a = normalize(&btc(), Interval::Hour1, &records, 20, at()).unwrap();
        let b = normalize(&btc(), Interval::Hour1, &records, 20, at()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.candles[1].timestamp, 1_700_003_600);
        assert_eq!(a.candles[1].low, 99.5);
    }

    #[test]
    fn test_normalize_empty_is_no_data() {
        let err = normalize(&btc(), Interval::Day1, &[], 20, at()).unwrap_err();
        assert!(matches!(err, MarketError::NoData(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_normalize_rejects_inconsistent_candle() {
        let records = vec![raw(
            json!(1),
            json!(10.0),
            json!(9.0),
            json!(8.0),
            json!(8.5),
            json!(1.0),
        )];
        let err = normalize(&btc(), Interval::Minute1, &records, 20, at()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidCandle(_)));
    }

    #[test]
    fn test_normalize_rejects_negative_price() {
        let records = vec![
            raw(json!(1), json!(-5.0), json!(-5.0), json!(-5.0), json!(-5.0), json!(1.0)),
            raw(json!(2), json!(-4.0), json!(-4.0), json!(-4.0), json!(-4.0), json!(1.0)),
        ];
        let err = normalize(&btc(), Interval::Minute1, &records, 20, at()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidCandle(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_normalize_rejects_negative_volume() {
        let records = vec![
            simple(1_700_000_000, 100.0),
            raw(
                json!(1_700_003_600),
                json!("100"),
                json!("101"),
                json!("99"),
                json!("100.5"),
                json!("-12"),
            ),
        ];
        let err = normalize(&btc(), Interval::Hour1, &records, 20, at()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidCandle(_)));
    }

    #[test]
    fn test_normalize_rejects_unrepresentable_timestamp() {
        let records = vec![simple(i64::MIN, 100.0), simple(1_700_000_000_000, 101.0)];
        let err = normalize(&btc(), Interval::Hour1, &records, 20, at()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidCandle(_)));
    }

    #[test]
    fn test_coerce_timestamp_rejects_unbounded_floats() {
        assert_eq!(coerce_timestamp(&json!(1.0e19)), 0);
        assert_eq!(coerce_timestamp(&json!(-1.0e19)), 0);
        assert_eq!(coerce_timestamp(&json!("-1700000000.75")), -1_700_000_000);
    }

    #[test]
    fn test_normalize_rejects_zero_target() {
        let records = vec![simple(1, 10.0)];
        let err = normalize(&btc(), Interval::Minute1, &records, 0, at()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
    }
}
