use thiserror::Error;

/// # Summary
/// 渲染服务错误枚举。
///
/// # Invariants
/// - 除 `NotFound` 外均可重试；重试与退避由调用方决定。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    // 序列或标的无效 (HTTP 404)
    #[error("Chart not found: {0}")]
    NotFound(String),
    // 渲染超时
    #[error("Render timed out: {0}")]
    Timeout(String),
    // 渲染服务限流 (HTTP 429)
    #[error("Rate limited by renderer: {0}")]
    RateLimited(String),
    // 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),
    // 渲染服务内部错误 (HTTP 5xx)
    #[error("Render service error: {0}")]
    Service(String),
    // 未知或未分类的错误
    #[error("Unknown render error: {0}")]
    Unknown(String),
}

impl RenderError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RenderError::NotFound(_))
    }
}
