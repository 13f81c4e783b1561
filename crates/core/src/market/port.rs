use crate::common::{Interval, Symbol};
use crate::market::entity::RawCandle;
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 市场行情数据提供者接口（原始数据源）。
///
/// # Invariants
/// - 只负责传输与信封解析，不做数值归一化。
/// - 实现者必须为网络调用设置超时，不得无限阻塞。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取指定标的、周期下最近 `count` 根原始 K 线。
    ///
    /// # Logic
    /// 1. 构建数据源请求。
    /// 2. 执行网络请求，将非 2xx 状态码映射为对应的 `MarketError`。
    /// 3. 校验响应信封中的 `candles` 数组并逐条返回原始记录。
    ///
    /// # Arguments
    /// * `symbol`: 规范化后的标的代码。
    /// * `interval`: K 线周期。
    /// * `count`: 请求的记录数。
    ///
    /// # Returns
    /// 成功返回原始记录列表（可能为空，由上层判定 NoData）。
    async fn fetch_raw(
        &self,
        symbol: &Symbol,
        interval: Interval,
        count: usize,
    ) -> Result<Vec<RawCandle>, MarketError>;
}
