use crate::enhance::EnhancedWindow;
use crate::spec::{format_tick, time_axis};
use thiserror::Error;

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
// 最高档位下标
const TOP: u8 = 7;

/// 文本降级渲染错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FallbackError {
    #[error("Cannot draw a sparkline from an empty window")]
    EmptyWindow,
}

/// # Summary
/// 将数值序列渲染为一行块字符。
///
/// # Logic
/// 1. 按序列最小/最大值线性映射到 8 级块字符。
/// 2. 所有值相同时统一使用中间档位。
pub fn sparkline(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|&v| {
            if !span.is_finite() || span <= 0.0 {
                return BLOCKS[usize::from(TOP / 2)];
            }
            let level = ((v - min) / span * f64::from(TOP)).round();
            // 取不高于 level 的最高档位，NaN 落到最低档
            BLOCKS
                .iter()
                .zip(0..=TOP)
                .rev()
                .find(|(_, step)| f64::from(*step) <= level)
                .map_or(BLOCKS[0], |(block, _)| *block)
        })
        .collect()
}

fn format_price(price: f64) -> String {
    if price.abs() >= 1.0 {
        format!("{:.2}", price)
    } else {
        format!("{:.6}", price)
    }
}

/// # Summary
/// 由增强窗口生成多行文本图表，渲染服务不可用时使用。
///
/// # Logic
/// 1. 首行：标的、周期、最新价与涨跌幅。
/// 2. 次行：收盘价 sparkline。
/// 3. 第三行：最高、最低与总成交量。
/// 4. 末行：首尾时间标签，格式与图表时间轴一致。
///
/// # Arguments
/// * `enhanced`: 增强后的窗口，不发起任何网络调用。
///
/// # Returns
/// 文本内容；空窗口返回 `FallbackError::EmptyWindow`。
pub fn render_fallback(enhanced: &EnhancedWindow) -> Result<String, FallbackError> {
    let window = &enhanced.window;
    let (first, last) = match (window.candles.first(), window.candles.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(FallbackError::EmptyWindow),
    };

    let closes: Vec<f64> = window.candles.iter().map(|c| c.close).collect();
    let axis = time_axis(window.interval);

    Ok(format!(
        "{} {}  last {} ({:+.2}%)\n{}\nH {}  L {}  Vol {:.2}\n{} -> {}",
        window.symbol,
        window.interval,
        format_price(window.latest_price),
        window.price_change_percent,
        sparkline(&closes),
        format_price(window.high),
        format_price(window.low),
        window.total_volume,
        format_tick(first.timestamp, &axis),
        format_tick(last.timestamp, &axis),
    ))
}
