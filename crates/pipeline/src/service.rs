use crate::artifact::{ArtifactCache, CachedArtifact, image_key, window_key};
use crate::error::{ChartError, ErrorKind};
use crate::outcome::{ArtifactOutput, ChartArtifact, RenderOutcome};
use crate::retry::RetryPolicy;
use candela_chart::enhance::{EnhancedWindow, enhance};
use candela_chart::quality::QualityAnalyzer;
use candela_chart::sparkline::render_fallback;
use candela_chart::spec::SpecBuilder;
use candela_core::cache::port::Cache;
use candela_core::chart::entity::{ChartSpecification, Dimensions, RenderedImage, Theme};
use candela_core::chart::error::RenderError;
use candela_core::chart::port::ChartRenderer;
use candela_core::common::time::TimeProvider;
use candela_core::common::{Interval, Symbol};
use candela_core::config::AppConfig;
use candela_core::market::entity::CandleWindow;
use candela_core::market::port::MarketDataProvider;
use candela_core::quality::entity::QualityVerdict;
use candela_feed::normalize::CandleNormalizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// 图片缓存中的条目，附带窗口的价格摘要
#[derive(Serialize, Deserialize)]
struct StoredImage {
    image: RenderedImage,
    latest_price: f64,
    price_change_percent: f64,
}

// 没有写入图片缓存的计算结果
enum Uncached {
    Failed(ChartError),
    Fallback {
        text: String,
        cause: RenderError,
        latest_price: f64,
        price_change_percent: f64,
    },
}

impl From<ChartError> for Uncached {
    fn from(err: ChartError) -> Self {
        Uncached::Failed(err)
    }
}

/// # Summary
/// 图表产物服务：抓取、评估、增强、构造规格、渲染，并在两层缓存之后对外提供。
///
/// # Invariants
/// - 单次请求内各阶段严格按序执行。
/// - 只有渲染成功的图片会写入图片缓存；文本降级每次重新生成。
/// - 质量问题只记录日志，不阻断渲染。
pub struct ChartService {
    normalizer: CandleNormalizer,
    renderer: Arc<dyn ChartRenderer>,
    cache: ArtifactCache,
    clock: Arc<dyn TimeProvider>,
    analyzer: QualityAnalyzer,
    builder: SpecBuilder,
    theme: Theme,
    retry: RetryPolicy,
    target_count: usize,
    min_candles: usize,
    window_ttl: Duration,
    image_ttl: Duration,
    render_timeout: Duration,
}

impl ChartService {
    /// # Summary
    /// 组装服务。
    ///
    /// # Arguments
    /// * `provider`: 行情数据源。
    /// * `renderer`: 图表渲染端。
    /// * `cache`: 缓存存储。
    /// * `clock`: 时钟，窗口生成时间与缓存时间均取自此处。
    /// * `config`: 应用配置。
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        renderer: Arc<dyn ChartRenderer>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn TimeProvider>,
        config: &AppConfig,
    ) -> Self {
        let builder = SpecBuilder::new()
            .with_series_type(config.render.series)
            .with_dimensions(Dimensions {
                width: config.render.width,
                height: config.render.height,
            });

        Self {
            normalizer: CandleNormalizer::new(provider, clock.clone()),
            renderer,
            cache: ArtifactCache::new(cache, clock.clone()),
            clock,
            analyzer: QualityAnalyzer::new(config.quality.clone()),
            builder,
            theme: config.render.theme,
            retry: RetryPolicy::from_config(&config.pipeline, config.provider.timeout()),
            target_count: config.pipeline.target_count,
            min_candles: config.pipeline.min_candles,
            window_ttl: config.cache.window_ttl(),
            image_ttl: config.cache.image_ttl(),
            render_timeout: config.render.timeout(),
        }
    }

    /// # Summary
    /// 获取某标的某周期的图表产物。
    ///
    /// # Logic
    /// 1. 规范化标的代码，非法时返回 `InvalidInput`。
    /// 2. 查图片缓存，命中即返回。
    /// 3. 未命中：取窗口（窗口缓存 + 重试）→ 数量检查 → 质量评估 → 增强 → 构造规格 → 渲染。
    /// 4. 渲染成功写入图片缓存；渲染失败返回文本降级；两者都失败时返回渲染端错误。
    ///
    /// # Arguments
    /// * `symbol`: 原始标的代码，大小写不敏感。
    /// * `interval`: K 线周期。
    ///
    /// # Returns
    /// 成功返回 `ChartArtifact`，失败返回带类别与可重试标记的 `ChartError`。
    pub async fn get_chart_artifact(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<ChartArtifact, ChartError> {
        let symbol =
            Symbol::parse(symbol).map_err(|e| ChartError::new(ErrorKind::InvalidInput, e))?;
        let key = image_key(&symbol, interval);

        let mut verdict = None;
        let verdict_slot = &mut verdict;
        let symbol_ref = &symbol;
        let result = self
            .cache
            .get_or_compute(&key, self.image_ttl, move || {
                self.produce_image(symbol_ref, interval, verdict_slot)
            })
            .await;

        match result {
            Ok(cached) => {
                info!(
                    "ChartService: served {} {} (cached={})",
                    symbol, interval, cached.is_cache_hit
                );
                let stored = cached.value;
                Ok(ChartArtifact {
                    symbol,
                    interval,
                    output: ArtifactOutput::Image(stored.image),
                    is_cached: cached.is_cache_hit,
                    generated_at: cached.cached_at,
                    verdict,
                    latest_price: stored.latest_price,
                    price_change_percent: stored.price_change_percent,
                })
            }
            Err(Uncached::Fallback {
                text,
                cause,
                latest_price,
                price_change_percent,
            }) => {
                info!(
                    "ChartService: served {} {} as sparkline ({})",
                    symbol, interval, cause
                );
                Ok(ChartArtifact {
                    symbol,
                    interval,
                    output: ArtifactOutput::Sparkline { text, cause },
                    is_cached: false,
                    generated_at: self.clock.now(),
                    verdict,
                    latest_price,
                    price_change_percent,
                })
            }
            Err(Uncached::Failed(err)) => {
                error!("ChartService: {} {} failed: {}", symbol, interval, err);
                Err(err)
            }
        }
    }

    /// # Summary
    /// 获取规范窗口，外层为窗口缓存，内层为带超时的重试。
    ///
    /// # Returns
    /// 窗口及其缓存元数据；抓取或归一化失败返回对应的 `ChartError`。
    pub async fn fetch_window(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> Result<CachedArtifact<CandleWindow>, ChartError> {
        let target = self.target_count;
        let key = window_key(symbol, interval, target);
        let label = format!("fetch {} {}", symbol, interval);
        let label = label.as_str();

        self.cache
            .get_or_compute(&key, self.window_ttl, move || async move {
                self.retry
                    .run(label, move || self.normalizer.fetch(symbol, interval, target))
                    .await
                    .map_err(ChartError::from)
            })
            .await
    }

    async fn produce_image(
        &self,
        symbol: &Symbol,
        interval: Interval,
        verdict_out: &mut Option<QualityVerdict>,
    ) -> Result<StoredImage, Uncached> {
        let window = self.fetch_window(symbol, interval).await?.value;
        if window.len() < self.min_candles {
            return Err(ChartError::new(
                ErrorKind::InsufficientData,
                format!(
                    "{} {} has {} candles, at least {} required",
                    symbol,
                    interval,
                    window.len(),
                    self.min_candles
                ),
            )
            .into());
        }

        let verdict = self.analyzer.analyze(&window, interval);
        if verdict.issues.is_empty() {
            debug!("ChartService: {} {} passed quality checks", symbol, interval);
        } else {
            for issue in &verdict.issues {
                warn!(
                    "ChartService: {} {} quality issue {:?}: {}",
                    symbol, interval, issue.kind, issue.message
                );
            }
        }
        if !verdict.suitable {
            warn!(
                "ChartService: {} {} is not suitable for charting, rendering anyway",
                symbol, interval
            );
        }
        *verdict_out = Some(verdict);

        let enhanced = enhance(&window);
        if enhanced.enhanced_count > 0 {
            debug!(
                "ChartService: widened {} flat candles for {} {}",
                enhanced.enhanced_count, symbol, interval
            );
        }

        let spec = self.builder.build(&enhanced, interval, self.theme);
        let latest_price = window.latest_price;
        let price_change_percent = window.price_change_percent;
        match self.render_with_fallback(&spec, &enhanced).await {
            RenderOutcome::Rendered(image) => Ok(StoredImage {
                image,
                latest_price,
                price_change_percent,
            }),
            RenderOutcome::FallbackRendered { text, cause } => Err(Uncached::Fallback {
                text,
                cause,
                latest_price,
                price_change_percent,
            }),
            RenderOutcome::Failed { cause, fallback } => Err(Uncached::Failed(
                ChartError::render_failed(cause, &fallback),
            )),
        }
    }

    /// # Summary
    /// 渲染一次，失败时降级为文本 sparkline。
    ///
    /// # Logic
    /// 1. 调用渲染端，超过渲染超时视为 `RenderError::Timeout`。
    /// 2. 成功返回 `Rendered`。
    /// 3. 失败时不重试，改用增强窗口生成文本；文本也无法生成时返回 `Failed`。
    ///
    /// # Arguments
    /// * `spec`: 图表规格。
    /// * `enhanced`: 构造该规格所用的增强窗口。
    pub async fn render_with_fallback(
        &self,
        spec: &ChartSpecification,
        enhanced: &EnhancedWindow,
    ) -> RenderOutcome {
        let attempt = tokio::time::timeout(self.render_timeout, self.renderer.render(spec));
        let rendered = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(format!(
                "renderer did not respond within {:?}",
                self.render_timeout
            ))),
        };

        let cause = match rendered {
            Ok(image) => return RenderOutcome::Rendered(image),
            Err(cause) => cause,
        };

        warn!(
            "ChartService: render of '{}' failed, falling back to sparkline: {}",
            spec.title, cause
        );
        match render_fallback(enhanced) {
            Ok(text) => RenderOutcome::FallbackRendered { text, cause },
            Err(fallback) => {
                error!(
                    "ChartService: sparkline fallback for '{}' failed: {}",
                    spec.title, fallback
                );
                RenderOutcome::Failed { cause, fallback }
            }
        }
    }

    /// # Summary
    /// 失效某标的的窗口与图片缓存。
    ///
    /// # Arguments
    /// * `symbol`: 原始标的代码。
    /// * `interval`: 指定时只失效该周期，否则失效该标的所有周期。
    ///
    /// # Returns
    /// 删除的键数量；标的非法返回 `InvalidInput`。
    pub async fn invalidate(
        &self,
        symbol: &str,
        interval: Option<Interval>,
    ) -> Result<usize, ChartError> {
        let symbol =
            Symbol::parse(symbol).map_err(|e| ChartError::new(ErrorKind::InvalidInput, e))?;
        let patterns = match interval {
            Some(interval) => [
                image_key(&symbol, interval),
                format!("window:{}_{}_*", symbol, interval),
            ],
            None => [
                format!("image:{}_*", symbol),
                format!("window:{}_*", symbol),
            ],
        };

        let mut removed = 0;
        for pattern in &patterns {
            removed += self.cache.invalidate(pattern).await;
        }
        info!("ChartService: invalidated {} cache entries for {}", removed, symbol);
        Ok(removed)
    }
}
