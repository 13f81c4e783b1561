use candela_core::market::entity::{Candle, CandleWindow};

/// 微扰幅度：收盘价的 0.15%。
pub const MICRO_VARIATION_RATIO: f64 = 0.0015;

/// # Summary
/// 增强后的窗口：平 K 线已被改写为可见的蜡烛形状。
///
/// # Invariants
/// - 仅用于可视化；`window` 的汇总统计沿用原窗口，不参与任何价格或盈亏计算。
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedWindow {
    pub window: CandleWindow,
    // 被改写的平 K 线数量
    pub enhanced_count: usize,
}

impl EnhancedWindow {
    pub fn candles(&self) -> &[Candle] {
        &self.window.candles
    }
}

/// # Summary
/// 为单根平 K 线合成不对称的微小波动。
///
/// # Logic
/// 1. 仅处理 open == high == low == close 且 close > 0 的 K 线，其余原样返回。
/// 2. m = close × 0.15%；open' = close - 0.2m，high' = close + m，
///    low' = close - 0.6m，close' = close + 0.1m。
///
/// # Arguments
/// * `candle`: 原始 K 线。
///
/// # Returns
/// 改写后的 K 线及是否发生改写。
pub fn enhance_candle(candle: &Candle) -> (Candle, bool) {
    if !candle.is_flat() || candle.close <= 0.0 {
        return (*candle, false);
    }

    let close = candle.close;
    let micro = close * MICRO_VARIATION_RATIO;
    let enhanced = Candle {
        timestamp: candle.timestamp,
        open: close - 0.2 * micro,
        high: close + micro,
        low: close - 0.6 * micro,
        close: close + 0.1 * micro,
        volume: candle.volume,
    };
    (enhanced, true)
}

/// # Summary
/// 对整个窗口执行平 K 线增强。纯变换。
///
/// # Arguments
/// * `window`: 归一化后的窗口。
///
/// # Returns
/// `EnhancedWindow`，包含改写数量。
pub fn enhance(window: &CandleWindow) -> EnhancedWindow {
    let mut enhanced_count = 0;
    let candles = window
        .candles
        .iter()
        .map(|c| {
            let (candle, changed) = enhance_candle(c);
            if changed {
                enhanced_count += 1;
            }
            candle
        })
        .collect();

    EnhancedWindow {
        window: CandleWindow {
            candles,
            ..window.clone()
        },
        enhanced_count,
    }
}
