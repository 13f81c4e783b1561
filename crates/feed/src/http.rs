use async_trait::async_trait;
use candela_core::common::{Interval, Symbol};
use candela_core::config::ProviderConfig;
use candela_core::market::entity::RawCandle;
use candela_core::market::error::MarketError;
use candela_core::market::port::MarketDataProvider;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// # Summary
/// 基于 HTTP 的行情数据源实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，客户端级别设置超时。
/// - 响应信封必须为 `{"candles": [...]}`。
#[derive(Clone)]
pub struct HttpCandleProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 数据源根地址，不含末尾斜杠
    base_url: String,
}

impl HttpCandleProvider {
    /// # Summary
    /// 创建一个新的 HttpCandleProvider 实例。
    ///
    /// # Logic
    /// 1. 安装 rustls 加密提供者。
    /// 2. 按配置设置请求超时与 User-Agent。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 数据源配置。
    ///
    /// # Returns
    /// 成功返回 Provider，客户端构建失败返回 `MarketError::Unknown`。
    pub fn new(config: &ProviderConfig) -> Result<Self, MarketError> {
        candela_core::install_crypto_provider();
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("candela/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// # Summary
/// 将非 2xx 状态码映射为市场错误。
///
/// # Logic
/// 404 视为标的/周期无历史数据；429 限流；408/504 超时；其余 5xx 为服务故障。
pub(crate) fn classify_status(status: StatusCode, body: &str) -> MarketError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::NOT_FOUND => MarketError::NoData(detail),
        StatusCode::TOO_MANY_REQUESTS => MarketError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => MarketError::Timeout(detail),
        s if s.is_server_error() => MarketError::Service(detail),
        _ => MarketError::Unknown(detail),
    }
}

fn classify_transport(err: reqwest::Error) -> MarketError {
    if err.is_timeout() {
        MarketError::Timeout(err.to_string())
    } else {
        MarketError::Network(err.to_string())
    }
}

/// # Summary
/// 从响应信封中取出原始 K 线记录。
///
/// # Logic
/// 1. 缺失 `candles` 字段或其不是数组时返回 `Schema`。
/// 2. 非对象元素无法表示一根 K 线，跳过并记录告警。
pub(crate) fn extract_records(body: &Value) -> Result<Vec<RawCandle>, MarketError> {
    let items = body
        .get("candles")
        .ok_or_else(|| MarketError::Schema("missing 'candles' field".to_string()))?
        .as_array()
        .ok_or_else(|| MarketError::Schema("'candles' is not an array".to_string()))?;

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if !item.is_object() {
            warn!("HttpCandleProvider: skipping non-object record at index {}", i);
            continue;
        }
        match serde_json::from_value::<RawCandle>(item.clone()) {
            Ok(record) => records.push(record),
            Err(e) => warn!("HttpCandleProvider: skipping record {}: {}", i, e),
        }
    }
    Ok(records)
}

#[async_trait]
impl MarketDataProvider for HttpCandleProvider {
    /// # Summary
    /// 从 HTTP 数据源抓取原始 K 线。
    ///
    /// # Logic
    /// 1. 构建 `GET {base_url}/candles?symbol=&interval=&limit=` 请求。
    /// 2. 传输层错误映射为 `Network` / `Timeout`。
    /// 3. 非 2xx 状态码按 `classify_status` 映射。
    /// 4. 响应体非 JSON 或信封不合法时返回 `Schema`。
    async fn fetch_raw(
        &self,
        symbol: &Symbol,
        interval: Interval,
        count: usize,
    ) -> Result<Vec<RawCandle>, MarketError> {
        let url = format!("{}/candles", self.base_url);
        let limit = count.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("interval", interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| MarketError::Schema(format!("invalid JSON body: {}", e)))?;

        let records = extract_records(&body)?;
        debug!(
            "HttpCandleProvider: {} {} -> {} records",
            symbol,
            interval,
            records.len()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            MarketError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "unknown symbol"),
            MarketError::NoData(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            MarketError::Service(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::GATEWAY_TIMEOUT, ""),
            MarketError::Timeout(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, ""),
            MarketError::Unknown(_)
        ));
    }

    #[test]
    fn test_extract_records_schema() {
        assert!(matches!(
            extract_records(&json!({"data": []})),
            Err(MarketError::Schema(_))
        ));
        assert!(matches!(
            extract_records(&json!({"candles": {"o": 1}})),
            Err(MarketError::Schema(_))
        ));

        let records =
            extract_records(&json!({"candles": [{"o": "1", "t": 5}, 7, {"c": 2}]})).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].o, json!("1"));
        assert_eq!(records[1].o, Value::Null);
    }
}
