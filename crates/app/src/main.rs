mod settings;

use candela_cache::mem::MemCache;
use candela_core::common::Interval;
use candela_core::common::time::{RealTimeProvider, TimeProvider};
use candela_feed::http::HttpCandleProvider;
use candela_pipeline::outcome::ArtifactOutput;
use candela_pipeline::service::ChartService;
use candela_render::http::HttpChartRenderer;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责加载配置、实例化具体适配器并通过 Arc<dyn Trait> 注入到 ChartService。
///
/// # Logic
/// 1. 解析命令行参数 `<SYMBOL> <INTERVAL>`。
/// 2. 加载配置并初始化全局日志。
/// 3. 实例化基础设施层（数据源、渲染端、缓存）。
/// 4. 构造 ChartService 并请求一次图表产物。
/// 5. 图片写入 `{SYMBOL}_{interval}.png`，降级时打印文本图表。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 命令行参数
    let mut args = std::env::args().skip(1);
    let (symbol, interval) = match (args.next(), args.next()) {
        (Some(symbol), Some(interval)) => (symbol, interval),
        _ => return Err("usage: candela-app <SYMBOL> <INTERVAL>".into()),
    };
    let interval: Interval = interval.parse()?;

    // 2. 配置与日志
    let config = settings::load_config(Path::new(settings::CONFIG_FILE), None)?;
    let _log_guard = settings::init_logging(&config.logging);
    info!(
        "Candela starting: provider={}, renderer={}",
        config.provider.base_url, config.render.base_url
    );

    // 3. 基础设施层
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let provider = Arc::new(HttpCandleProvider::new(&config.provider)?);
    let renderer = Arc::new(HttpChartRenderer::new(&config.render)?);
    let cache = Arc::new(MemCache::with_clock(clock.clone()));

    // 4. 应用服务层
    let service = ChartService::new(provider, renderer, cache, clock, &config);
    let artifact = service.get_chart_artifact(&symbol, interval).await?;

    if let Some(verdict) = &artifact.verdict {
        info!(
            "Quality: suitable={}, issues={}, range={:.4}%",
            verdict.suitable,
            verdict.issues.len(),
            verdict.price_range_percent
        );
    }

    // 5. 输出
    match &artifact.output {
        ArtifactOutput::Image(image) => {
            let path = format!("{}_{}.png", artifact.symbol, artifact.interval);
            tokio::fs::write(&path, &image.bytes).await?;
            info!("Wrote {} ({} bytes)", path, image.bytes.len());
            println!("{}", path);
        }
        ArtifactOutput::Sparkline { text, cause } => {
            warn!("Renderer unavailable ({}), printing sparkline", cause);
            println!("{}", text);
        }
    }

    Ok(())
}
