use crate::document::RenderRequest;
use async_trait::async_trait;
use candela_core::chart::entity::{ChartSpecification, RenderedImage};
use candela_core::chart::error::RenderError;
use candela_core::chart::port::ChartRenderer;
use candela_core::config::RenderConfig;
use reqwest::{Client, StatusCode, header};
use tracing::debug;

/// # Summary
/// 基于 HTTP 的图表渲染客户端，兼容 QuickChart 风格的 `POST /chart` 接口。
///
/// # Invariants
/// - 单次请求受客户端超时约束。
/// - 不做内部重试，失败一律映射为 `RenderError` 交由调用方处理。
#[derive(Clone)]
pub struct HttpChartRenderer {
    /// The HTTP client used for requests.
    client: Client,
    /// 渲染服务根地址，不含末尾斜杠
    base_url: String,
    /// Chart.js 主版本
    version: String,
}

impl HttpChartRenderer {
    /// # Summary
    /// 创建渲染客户端。
    ///
    /// # Arguments
    /// * `config` - 渲染服务配置（地址、超时、版本）。
    ///
    /// # Returns
    /// * 成功返回客户端，构建失败返回 `RenderError::Unknown`。
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        candela_core::install_crypto_provider();
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("candela/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RenderError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            version: config.version.clone(),
        })
    }
}

/// # Summary
/// 将非 2xx 状态码映射为渲染错误。
pub(crate) fn classify_status(status: StatusCode, body: &str) -> RenderError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::NOT_FOUND => RenderError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => RenderError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RenderError::Timeout(detail),
        s if s.is_server_error() => RenderError::Service(detail),
        _ => RenderError::Unknown(detail),
    }
}

fn classify_transport(err: reqwest::Error) -> RenderError {
    if err.is_timeout() {
        RenderError::Timeout(err.to_string())
    } else {
        RenderError::Network(err.to_string())
    }
}

#[async_trait]
impl ChartRenderer for HttpChartRenderer {
    /// # Summary
    /// 提交图表规格并取回图片。
    ///
    /// # Logic
    /// 1. 将规格转换为渲染服务请求体。
    /// 2. POST 到 `{base_url}/chart`。
    /// 3. 非 2xx 状态码按 `classify_status` 映射；空响应体视为未知错误。
    ///
    /// # Arguments
    /// * `spec` - 图表规格。
    ///
    /// # Returns
    /// * 成功返回图片字节与 Content-Type。
    async fn render(&self, spec: &ChartSpecification) -> Result<RenderedImage, RenderError> {
        let url = format!("{}/chart", self.base_url);
        let payload = RenderRequest::from_spec(spec, &self.version);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await.map_err(classify_transport)?;
        if bytes.is_empty() {
            return Err(RenderError::Unknown("renderer returned an empty body".to_string()));
        }

        debug!(
            "HttpChartRenderer: rendered '{}' ({} bytes, {})",
            spec.title,
            bytes.len(),
            content_type
        );
        Ok(RenderedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
