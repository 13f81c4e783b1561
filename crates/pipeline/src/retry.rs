use candela_core::config::PipelineConfig;
use candela_core::market::error::MarketError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// # Summary
/// 数据源抓取的重试策略：有限次数、指数退避、单次调用超时。
///
/// # Invariants
/// - 仅对 `MarketError::is_retryable()` 为真的错误重试。
/// - 限流错误的退避时长翻倍。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    // 总尝试次数（含首次），至少为 1
    pub max_attempts: u32,
    pub base_backoff: Duration,
    // 单次调用的超时上限
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: config.fetch_attempts.max(1),
            base_backoff: config.retry_backoff(),
            attempt_timeout,
        }
    }

    /// 第 `attempt` 次失败后的等待时长（从 1 开始计）。
    pub fn backoff(&self, attempt: u32, err: &MarketError) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base_backoff.saturating_mul(factor);
        match err {
            MarketError::RateLimited(_) => delay.saturating_mul(2),
            _ => delay,
        }
    }

    /// # Summary
    /// 按策略执行异步操作。
    ///
    /// # Logic
    /// 1. 每次调用包裹在 `tokio::time::timeout` 中，超时转为 `MarketError::Timeout`。
    /// 2. 可重试错误且仍有剩余次数时，退避后重试。
    /// 3. 不可重试错误或次数耗尽时返回最后一次错误。
    ///
    /// # Arguments
    /// * `label`: 日志中标识本次操作。
    /// * `op`: 每次尝试都会重新调用以生成新的 Future。
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, MarketError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketError>>,
    {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(MarketError::Timeout(format!(
                    "{} did not finish within {:?}",
                    label, self.attempt_timeout
                ))),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt, &e);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
