use candela_core::chart::entity::{ChartSeries, ChartSpecification};
use serde::Serialize;
use serde_json::{Value, json};

/// # Summary
/// 渲染服务请求体。
///
/// # Invariants
/// - `chart` 为 Chart.js 风格的声明式配置，蜡烛图依赖 financial 插件。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub version: String,
    pub background_color: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub chart: Value,
}

impl RenderRequest {
    /// # Summary
    /// 将图表规格转换为渲染服务请求体。
    ///
    /// # Arguments
    /// * `spec`: 图表规格。
    /// * `version`: 渲染端 Chart.js 主版本。
    ///
    /// # Returns
    /// 可直接序列化发送的请求体。
    pub fn from_spec(spec: &ChartSpecification, version: &str) -> Self {
        Self {
            version: version.to_string(),
            background_color: spec.theme.palette().background.to_string(),
            width: spec.dimensions.width,
            height: spec.dimensions.height,
            format: "png".to_string(),
            chart: chart_config(spec),
        }
    }
}

fn dataset(spec: &ChartSpecification) -> (&'static str, Value) {
    let colors = &spec.color_policy;
    match &spec.series {
        ChartSeries::Candlestick(points) => (
            "candlestick",
            json!({
                "label": spec.title,
                "data": points,
                "color": {
                    "up": colors.up,
                    "down": colors.down,
                    "unchanged": colors.unchanged,
                },
                "borderColor": {
                    "up": colors.up,
                    "down": colors.down,
                    "unchanged": colors.unchanged,
                },
            }),
        ),
        ChartSeries::Line(points) => {
            // 整体方向决定线条颜色
            let color = match (points.first(), points.last()) {
                (Some(first), Some(last)) => colors.color_for(first.y, last.y),
                _ => colors.unchanged.as_str(),
            };
            (
                "line",
                json!({
                    "label": spec.title,
                    "data": points,
                    "borderColor": color,
                    "borderWidth": 2,
                    "pointRadius": 0,
                    "fill": false,
                }),
            )
        }
        ChartSeries::Bar(points) => {
            let data: Vec<Value> = points.iter().map(|p| json!({"x": p.x, "y": p.y})).collect();
            let background: Vec<&str> = points.iter().map(|p| p.color.as_str()).collect();
            (
                "bar",
                json!({
                    "label": spec.title,
                    "data": data,
                    "backgroundColor": background,
                }),
            )
        }
    }
}

/// # Summary
/// 生成 Chart.js 配置。
///
/// # Logic
/// 1. 按序列类型生成 dataset 与图表类型。
/// 2. X 轴为时间轴，单位、显示格式与最大刻度数来自规格。
/// 3. Y 轴上下界直接使用规格中的区间。
/// 4. 文本与网格颜色取自主题。
pub fn chart_config(spec: &ChartSpecification) -> Value {
    let palette = spec.theme.palette();
    let (chart_type, dataset) = dataset(spec);
    let unit = spec.x_axis.unit.as_str();

    json!({
        "type": chart_type,
        "data": { "datasets": [dataset] },
        "options": {
            "animation": false,
            "plugins": {
                "legend": { "display": false },
                "title": {
                    "display": true,
                    "text": spec.title,
                    "color": palette.text,
                },
            },
            "scales": {
                "x": {
                    "type": "time",
                    "time": {
                        "unit": unit,
                        "displayFormats": { unit: spec.x_axis.tick_format },
                    },
                    "ticks": {
                        "maxTicksLimit": spec.x_axis.max_ticks,
                        "autoSkip": true,
                        "color": palette.text,
                    },
                    "grid": { "color": palette.grid },
                },
                "y": {
                    "min": spec.y_axis.min,
                    "max": spec.y_axis.max,
                    "position": "right",
                    "ticks": { "color": palette.text },
                    "grid": { "color": palette.grid },
                },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candela_core::chart::entity::{
        AxisRange, ColorPolicy, Dimensions, OhlcPoint, Theme, TimeAxis, TimeUnit, ValuePoint,
    };

    fn spec(series: ChartSeries) -> ChartSpecification {
        ChartSpecification {
            title: "BTC 1h".to_string(),
            series,
            y_axis: AxisRange {
                min: 99.5,
                max: 100.5,
            },
            x_axis: TimeAxis {
                unit: TimeUnit::Hour,
                tick_format: "HH:00".to_string(),
                label_format: "%H:00".to_string(),
                max_ticks: 10,
            },
            color_policy: ColorPolicy::default(),
            dimensions: Dimensions::default(),
            theme: Theme::Light,
        }
    }

    #[test]
    fn test_candlestick_document() {
        let spec = spec(ChartSeries::Candlestick(vec![OhlcPoint {
            x: 1_700_000_000_000,
            o: 99.97,
            h: 100.15,
            l: 99.91,
            c: 100.015,
        }]));
        let request = RenderRequest::from_spec(&spec, "3");
        let doc = serde_json::to_value(&request).unwrap();

        assert_eq!(doc["backgroundColor"], "#ffffff");
        assert_eq!(doc["width"], 800);
        assert_eq!(doc["format"], "png");
        assert_eq!(doc["chart"]["type"], "candlestick");
        assert_eq!(doc["chart"]["data"]["datasets"][0]["data"][0]["h"], 100.15);
        assert_eq!(doc["chart"]["options"]["scales"]["y"]["min"], 99.5);
        assert_eq!(
            doc["chart"]["options"]["scales"]["x"]["time"]["displayFormats"]["hour"],
            "HH:00"
        );
        assert_eq!(
            doc["chart"]["options"]["scales"]["x"]["ticks"]["maxTicksLimit"],
            10
        );
    }

    #[test]
    fn test_line_color_follows_direction() {
        let spec = spec(ChartSeries::Line(vec![
            ValuePoint { x: 0, y: 10.0 },
            ValuePoint { x: 1, y: 8.0 },
        ]));
        let config = chart_config(&spec);
        assert_eq!(config["type"], "line");
        assert_eq!(config["data"]["datasets"][0]["borderColor"], "#ef5350");
    }
}
