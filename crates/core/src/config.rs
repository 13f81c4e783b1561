use crate::chart::entity::{SeriesType, Theme};
use crate::quality::entity::QualityThresholds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub render: RenderConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub quality: QualityThresholds,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub width: u32,
    pub height: u32,
    pub theme: Theme,
    // 蜡烛图 / 收盘价折线 / 成交量柱
    pub series: SeriesType,
    // 渲染端 Chart.js 主版本
    pub version: String,
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://quickchart.io".to_string(),
            timeout_secs: 20,
            width: 800,
            height: 400,
            theme: Theme::Dark,
            series: SeriesType::Candlestick,
            version: "3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub window_ttl_secs: u64,
    pub image_ttl_secs: u64,
}

impl CacheConfig {
    pub fn window_ttl(&self) -> Duration {
        Duration::from_secs(self.window_ttl_secs)
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            window_ttl_secs: 300,
            image_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // 每次向数据源请求的固定窗口大小
    pub target_count: usize,
    // 低于该数量直接报 InsufficientData
    pub min_candles: usize,
    pub fetch_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl PipelineConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_count: 20,
            min_candles: 2,
            fetch_attempts: 2,
            retry_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // EnvFilter 语法，RUST_LOG 存在时以其为准
    pub level: String,
    // 设置后额外按天滚动写入该目录
    pub directory: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider.timeout(), Duration::from_secs(10));
        assert_eq!(config.render.timeout(), Duration::from_secs(20));
        assert_eq!(config.cache.window_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.image_ttl(), Duration::from_secs(300));
        assert_eq!(config.pipeline.target_count, 20);
        assert_eq!(config.quality.flatness_percent, 0.05);
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"pipeline": {"target_count": 30}}"#).unwrap();
        assert_eq!(config.pipeline.target_count, 30);
        assert_eq!(config.pipeline.min_candles, 2);
        assert_eq!(config.render.width, 800);
    }
}
