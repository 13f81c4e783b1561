use candela_chart::sparkline::FallbackError;
use candela_core::chart::entity::RenderedImage;
use candela_core::chart::error::RenderError;
use candela_core::common::{Interval, Symbol};
use candela_core::quality::entity::QualityVerdict;
use chrono::{DateTime, Utc};

/// # Summary
/// 单次渲染尝试的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// 渲染服务返回了图片
    Rendered(RenderedImage),
    /// 渲染失败，已降级为文本 sparkline
    FallbackRendered { text: String, cause: RenderError },
    /// 渲染与降级均失败
    Failed {
        cause: RenderError,
        fallback: FallbackError,
    },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered(_))
    }
}

/// 产物内容：图片或文本降级。
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutput {
    Image(RenderedImage),
    Sparkline { text: String, cause: RenderError },
}

/// # Summary
/// 上游 `get_chart_artifact` 的返回值。
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub symbol: Symbol,
    pub interval: Interval,
    pub output: ArtifactOutput,
    // 图片是否取自缓存
    pub is_cached: bool,
    pub generated_at: DateTime<Utc>,
    // 仅在本次实际计算时给出
    pub verdict: Option<QualityVerdict>,
    pub latest_price: f64,
    pub price_change_percent: f64,
}

impl ChartArtifact {
    pub fn image(&self) -> Option<&RenderedImage> {
        match &self.output {
            ArtifactOutput::Image(image) => Some(image),
            ArtifactOutput::Sparkline { .. } => None,
        }
    }

    pub fn sparkline(&self) -> Option<&str> {
        match &self.output {
            ArtifactOutput::Sparkline { text, .. } => Some(text),
            ArtifactOutput::Image(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.output, ArtifactOutput::Sparkline { .. })
    }
}
