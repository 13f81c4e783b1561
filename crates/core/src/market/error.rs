use thiserror::Error;

/// # Summary
/// 市场数据域错误枚举，覆盖网络、限流、解析及数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `is_retryable` 决定调用方是否可以重试。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 请求超时
    #[error("Request timed out: {0}")]
    Timeout(String),
    // 数据源限流 (HTTP 429)
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),
    // 数据源服务端故障 (HTTP 5xx)
    #[error("Provider service error: {0}")]
    Service(String),
    // 数据源返回零条记录
    #[error("No data for {0}")]
    NoData(String),
    // 响应结构不符合约定，如缺失 candles 数组
    #[error("Schema error: {0}")]
    Schema(String),
    // 单根 K 线违反 OHLC 不变式
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),
    // 调用参数非法
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    // 未知或未分类的错误
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl MarketError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarketError::Network(_)
                | MarketError::Timeout(_)
                | MarketError::RateLimited(_)
                | MarketError::Service(_)
                | MarketError::Unknown(_)
        )
    }
}
