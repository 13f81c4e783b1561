use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 图表序列类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    #[default]
    Candlestick,
    Line,
    Bar,
}

/// 蜡烛图数据点，`x` 为毫秒时间戳。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    pub x: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
}

/// 折线图数据点。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub x: i64,
    pub y: f64,
}

/// 柱状图数据点，颜色随涨跌方向变化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarPoint {
    pub x: i64,
    pub y: f64,
    pub color: String,
}

/// # Summary
/// 图表数据序列，数据点形状由序列类型决定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "points", rename_all = "lowercase")]
pub enum ChartSeries {
    Candlestick(Vec<OhlcPoint>),
    Line(Vec<ValuePoint>),
    Bar(Vec<BarPoint>),
}

impl ChartSeries {
    pub fn series_type(&self) -> SeriesType {
        match self {
            ChartSeries::Candlestick(_) => SeriesType::Candlestick,
            ChartSeries::Line(_) => SeriesType::Line,
            ChartSeries::Bar(_) => SeriesType::Bar,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChartSeries::Candlestick(points) => points.len(),
            ChartSeries::Line(points) => points.len(),
            ChartSeries::Bar(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Y 轴数值区间。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn height(&self) -> f64 {
        self.max - self.min
    }
}

/// 时间轴显示粒度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        }
    }
}

/// # Summary
/// 时间轴刻度策略。
///
/// # Invariants
/// - `tick_format` 为渲染端识别的显示模式（如 `HH:mm`）。
/// - `label_format` 为等价的 chrono 格式串，供本地文本渲染使用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    pub unit: TimeUnit,
    pub tick_format: String,
    pub label_format: String,
    pub max_ticks: usize,
}

/// # Summary
/// 涨跌配色策略，固定调色板，不对用户开放配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPolicy {
    pub up: String,
    pub down: String,
    pub unchanged: String,
}

impl ColorPolicy {
    /// 根据开收盘价选择颜色。
    pub fn color_for(&self, open: f64, close: f64) -> &str {
        if close > open {
            &self.up
        } else if close < open {
            &self.down
        } else {
            &self.unchanged
        }
    }
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            up: "#26a69a".to_string(),
            down: "#ef5350".to_string(),
            unchanged: "#9e9e9e".to_string(),
        }
    }
}

/// 输出图片尺寸（像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
        }
    }
}

/// 主题。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// 主题对应的基础配色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: &'static str,
    pub text: &'static str,
    pub grid: &'static str,
}

impl Theme {
    pub fn palette(self) -> ThemePalette {
        match self {
            Theme::Dark => ThemePalette {
                background: "#131722",
                text: "#d1d4dc",
                grid: "#2a2e39",
            },
            Theme::Light => ThemePalette {
                background: "#ffffff",
                text: "#131722",
                grid: "#e0e3eb",
            },
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(format!("Unknown theme: {}", s)),
        }
    }
}

/// # Summary
/// 与渲染引擎无关的图表描述。
///
/// # Invariants
/// - 纯值对象：每次渲染请求重新构造，构造后不再修改。
/// - 相同输入构造出的规格完全相等 (`PartialEq`)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpecification {
    pub title: String,
    pub series: ChartSeries,
    pub y_axis: AxisRange,
    pub x_axis: TimeAxis,
    pub color_policy: ColorPolicy,
    pub dimensions: Dimensions,
    pub theme: Theme,
}

impl ChartSpecification {
    pub fn series_type(&self) -> SeriesType {
        self.series.series_type()
    }
}

/// 渲染服务返回的栅格图片。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_policy_direction() {
        let policy = ColorPolicy::default();
        assert_eq!(policy.color_for(1.0, 2.0), "#26a69a");
        assert_eq!(policy.color_for(2.0, 1.0), "#ef5350");
        assert_eq!(policy.color_for(1.0, 1.0), "#9e9e9e");
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("LIGHT".parse::<Theme>().unwrap(), Theme::Light);
        assert!("neon".parse::<Theme>().is_err());
        assert_eq!(Theme::Dark.palette().background, "#131722");
    }
}
