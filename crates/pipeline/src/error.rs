//! # 管线统一错误
//!
//! 将数据源与渲染端的错误统一映射为带类别与可重试标记的 `ChartError`。

use candela_chart::sparkline::FallbackError;
use candela_core::chart::error::RenderError;
use candela_core::market::error::MarketError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// 该标的/周期没有任何历史数据
    NoData,
    /// 数据源响应结构或数据本身不合法
    SchemaError,
    /// 窗口短于最低要求，历史数据累积后可能恢复
    InsufficientData,
    NetworkError,
    Timeout,
    RateLimited,
    ServiceError,
    /// 渲染端认为序列或标的无效
    NotFound,
    /// 调用参数非法
    InvalidInput,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NoData => "NoData",
            ErrorKind::SchemaError => "SchemaError",
            ErrorKind::InsufficientData => "InsufficientData",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ServiceError => "ServiceError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UnknownError => "UnknownError",
        }
    }

    /// 类别的默认可重试性。
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorKind::NoData | ErrorKind::SchemaError | ErrorKind::NotFound | ErrorKind::InvalidInput
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 管线对上游暴露的详细错误
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ChartError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ChartError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    /// 渲染与文本降级均失败时的错误，类别取自渲染端。
    pub fn render_failed(cause: RenderError, fallback: &FallbackError) -> Self {
        let mut err = ChartError::from(cause);
        err.message = format!("{}; fallback failed: {}", err.message, fallback);
        err
    }
}

/// 从 `MarketError` 转换
impl From<MarketError> for ChartError {
    fn from(err: MarketError) -> Self {
        let kind = match &err {
            MarketError::Network(_) => ErrorKind::NetworkError,
            MarketError::Timeout(_) => ErrorKind::Timeout,
            MarketError::RateLimited(_) => ErrorKind::RateLimited,
            MarketError::Service(_) => ErrorKind::ServiceError,
            MarketError::NoData(_) => ErrorKind::NoData,
            MarketError::Schema(_) | MarketError::InvalidCandle(_) => ErrorKind::SchemaError,
            MarketError::InvalidInput(_) => ErrorKind::InvalidInput,
            MarketError::Unknown(_) => ErrorKind::UnknownError,
        };
        ChartError::new(kind, err.to_string())
    }
}

/// 从 `RenderError` 转换
impl From<RenderError> for ChartError {
    fn from(err: RenderError) -> Self {
        let kind = match &err {
            RenderError::NotFound(_) => ErrorKind::NotFound,
            RenderError::Timeout(_) => ErrorKind::Timeout,
            RenderError::RateLimited(_) => ErrorKind::RateLimited,
            RenderError::Network(_) => ErrorKind::NetworkError,
            RenderError::Service(_) => ErrorKind::ServiceError,
            RenderError::Unknown(_) => ErrorKind::UnknownError,
        };
        ChartError::new(kind, err.to_string())
    }
}
