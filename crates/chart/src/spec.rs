use crate::enhance::EnhancedWindow;
use candela_core::chart::entity::{
    AxisRange, BarPoint, ChartSeries, ChartSpecification, ColorPolicy, Dimensions, OhlcPoint,
    SeriesType, Theme, TimeAxis, TimeUnit, ValuePoint,
};
use candela_core::common::Interval;
use candela_core::market::entity::Candle;
use chrono::DateTime;

/// 所有周期统一的最大刻度数：20 根 K 线约每 2 根一个标签。
pub const MAX_TICKS: usize = 10;
/// 最小可视高度：价格中值的 1%。
pub const MIN_VISUAL_RANGE_RATIO: f64 = 0.01;
/// 常规情况下上下各留 10% 的边距。
pub const AXIS_PADDING_RATIO: f64 = 0.1;

/// # Summary
/// 计算 Y 轴区间，保证近乎水平的行情也有可见的蜡烛实体。
///
/// # Logic
/// 1. 取全部 OHLC 的最小值与最大值，range = max - min，avg = (max + min) / 2。
/// 2. range 小于 avg × 1% 时，以 avg 为中心强制展开到 avg × 1%。
/// 3. 否则上下各加 10% 边距，下界不低于 0。
/// 4. 没有正价格时返回 [0, 1]。
///
/// # Arguments
/// * `candles`: 增强后的 K 线。
///
/// # Returns
/// `AxisRange`。
pub fn y_axis_range(candles: &[Candle]) -> AxisRange {
    let (min, max) = candles
        .iter()
        .flat_map(|c| [c.open, c.high, c.low, c.close])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() || max <= 0.0 {
        return AxisRange { min: 0.0, max: 1.0 };
    }

    let range = max - min;
    let avg = (max + min) / 2.0;
    let min_visual_range = avg * MIN_VISUAL_RANGE_RATIO;

    if range < min_visual_range {
        AxisRange {
            min: avg - min_visual_range / 2.0,
            max: avg + min_visual_range / 2.0,
        }
    } else {
        let padding = range * AXIS_PADDING_RATIO;
        AxisRange {
            min: (min - padding).max(0.0),
            max: max + padding,
        }
    }
}

/// # Summary
/// 按周期查表得到时间轴粒度与刻度格式。
pub fn time_axis(interval: Interval) -> TimeAxis {
    let (unit, tick_format, label_format) = match interval {
        Interval::Minute1 | Interval::Minute5 | Interval::Minute15 => {
            (TimeUnit::Minute, "HH:mm", "%H:%M")
        }
        Interval::Hour1 => (TimeUnit::Hour, "HH:00", "%H:00"),
        Interval::Hour4 => (TimeUnit::Hour, "DD/MM HH:00", "%d/%m %H:00"),
        Interval::Day1 => (TimeUnit::Day, "DD/MM", "%d/%m"),
    };
    TimeAxis {
        unit,
        tick_format: tick_format.to_string(),
        label_format: label_format.to_string(),
        max_ticks: MAX_TICKS,
    }
}

/// 按时间轴策略格式化秒级时间戳（UTC）。
pub fn format_tick(timestamp: i64, axis: &TimeAxis) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format(&axis.label_format).to_string())
        .unwrap_or_default()
}

/// # Summary
/// 图表规格构造器。
///
/// # Invariants
/// - 构造结果只取决于输入，重复构造得到相等的规格。
#[derive(Debug, Clone, Default)]
pub struct SpecBuilder {
    series_type: SeriesType,
    dimensions: Dimensions,
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series_type(mut self, series_type: SeriesType) -> Self {
        self.series_type = series_type;
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// # Summary
    /// 由增强窗口构造图表规格。
    ///
    /// # Logic
    /// 1. 计算 Y 轴区间。
    /// 2. 查表得到时间轴策略。
    /// 3. 按序列类型生成数据点，时间戳转为毫秒。
    ///
    /// # Arguments
    /// * `enhanced`: 增强后的窗口。
    /// * `interval`: 目标周期。
    /// * `theme`: 主题。
    ///
    /// # Returns
    /// `ChartSpecification`。
    pub fn build(
        &self,
        enhanced: &EnhancedWindow,
        interval: Interval,
        theme: Theme,
    ) -> ChartSpecification {
        let candles = enhanced.candles();
        let color_policy = ColorPolicy::default();

        let series = match self.series_type {
            SeriesType::Candlestick => ChartSeries::Candlestick(
                candles
                    .iter()
                    .map(|c| OhlcPoint {
                        x: to_millis(c.timestamp),
                        o: c.open,
                        h: c.high,
                        l: c.low,
                        c: c.close,
                    })
                    .collect(),
            ),
            SeriesType::Line => ChartSeries::Line(
                candles
                    .iter()
                    .map(|c| ValuePoint {
                        x: to_millis(c.timestamp),
                        y: c.close,
                    })
                    .collect(),
            ),
            SeriesType::Bar => ChartSeries::Bar(
                candles
                    .iter()
                    .map(|c| BarPoint {
                        x: to_millis(c.timestamp),
                        y: c.volume,
                        color: color_policy.color_for(c.open, c.close).to_string(),
                    })
                    .collect(),
            ),
        };

        let y_axis = match self.series_type {
            SeriesType::Bar => volume_axis_range(candles),
            _ => y_axis_range(candles),
        };

        ChartSpecification {
            title: format!("{} {}", enhanced.window.symbol, interval),
            series,
            y_axis,
            x_axis: time_axis(interval),
            color_policy,
            dimensions: self.dimensions,
            theme,
        }
    }
}

/// 使用默认构造器（蜡烛图，800×400）构造规格。
pub fn build(enhanced: &EnhancedWindow, interval: Interval, theme: Theme) -> ChartSpecification {
    SpecBuilder::default().build(enhanced, interval, theme)
}

// 成交量柱状图从 0 起画
fn volume_axis_range(candles: &[Candle]) -> AxisRange {
    let max = candles.iter().map(|c| c.volume).fold(0.0, f64::max);
    if max > 0.0 {
        AxisRange {
            min: 0.0,
            max: max * (1.0 + AXIS_PADDING_RATIO),
        }
    } else {
        AxisRange { min: 0.0, max: 1.0 }
    }
}

fn to_millis(timestamp: i64) -> i64 {
    timestamp.saturating_mul(1000)
}
