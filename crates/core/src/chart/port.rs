use crate::chart::entity::{ChartSpecification, RenderedImage};
use crate::chart::error::RenderError;
use async_trait::async_trait;

/// # Summary
/// 外部图表渲染服务接口。
///
/// # Invariants
/// - 实现内部不做重试，失败时返回带类型的 `RenderError` 以便调用方降级。
/// - 网络调用必须有超时上限。
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// # Summary
    /// 将图表规格提交给渲染服务并返回栅格图片。
    ///
    /// # Arguments
    /// * `spec`: 与渲染引擎无关的图表描述。
    ///
    /// # Returns
    /// 成功返回图片字节，失败返回 `RenderError`。
    async fn render(&self, spec: &ChartSpecification) -> Result<RenderedImage, RenderError>;
}
