use axum::Router;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use candela_core::common::time::RealTimeProvider;
use candela_core::common::{Interval, Symbol};
use candela_core::config::ProviderConfig;
use candela_core::market::error::MarketError;
use candela_core::market::port::MarketDataProvider;
use candela_feed::http::HttpCandleProvider;
use candela_feed::normalize::CandleNormalizer;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

// 帮助函数：在随机端口启动模拟数据源
async fn spawn_provider(router: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    Ok(addr)
}

fn provider_for(base_url: String) -> HttpCandleProvider {
    HttpCandleProvider::new(&ProviderConfig {
        base_url,
        timeout_secs: 5,
    })
    .unwrap()
}

/// 按请求的 limit 返回混合编码的 K 线（倒序、毫秒时间戳、字符串数字）。
async fn candles_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let limit: i64 = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(20);
    let base = 1_700_000_000_i64;
    let candles: Vec<Value> = (0..limit + 5)
        .rev()
        .map(|i| {
            let price = 50_000.0 + f64::from(i32::try_from(i).unwrap_or(0)) * 10.0;
            json!({
                "o": price.to_string(),
                "h": price + 25.0,
                "l": format!("{}", price - 25.0),
                "c": price + 5.0,
                "v": "12.5",
                "t": (base + i * 3600) * 1000,
            })
        })
        .collect();
    Json(json!({ "candles": candles }))
}

#[tokio::test]
async fn test_fetch_and_normalize_mixed_encodings() -> anyhow::Result<()> {
    let addr = spawn_provider(Router::new().route("/candles", get(candles_handler))).await?;
    let provider: Arc<dyn MarketDataProvider> = Arc::new(provider_for(addr));
    let normalizer = CandleNormalizer::new(provider, Arc::new(RealTimeProvider));

    let symbol = Symbol::parse("btc").unwrap();
    let window = normalizer.fetch(&symbol, Interval::Hour1, 20).await?;

    assert_eq!(window.symbol.as_str(), "BTC");
    assert_eq!(window.len(), 20);
    assert!(window.candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    // 保留最近的 20 根：时间戳 base+5h .. base+24h
    assert_eq!(window.candles[0].timestamp, 1_700_000_000 + 5 * 3600);
    assert_eq!(window.candles[19].timestamp, 1_700_000_000 + 24 * 3600);
    assert_eq!(window.candles[0].volume, 12.5);
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_status() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/candles",
        get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let addr = spawn_provider(router).await?;
    let provider = provider_for(addr);

    let err = provider
        .fetch_raw(&Symbol::parse("ETH").unwrap(), Interval::Minute5, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::RateLimited(_)));
    assert!(err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_missing_candles_field_is_schema_error() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/candles",
        get(|| async { Json(json!({ "result": [] })) }),
    );
    let addr = spawn_provider(router).await?;
    let provider = provider_for(addr);

    let err = provider
        .fetch_raw(&Symbol::parse("ETH").unwrap(), Interval::Day1, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Schema(_)));
    assert!(!err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_empty_candles_is_no_data() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/candles",
        get(|| async { Json(json!({ "candles": [] })) }),
    );
    let addr = spawn_provider(router).await?;
    let provider: Arc<dyn MarketDataProvider> = Arc::new(provider_for(addr));
    let normalizer = CandleNormalizer::new(provider, Arc::new(RealTimeProvider));

    let err = normalizer
        .fetch(&Symbol::parse("DOGE").unwrap(), Interval::Minute1, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::NoData(_)));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    // 绑定后立即释放端口，保证无人监听
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let provider = provider_for(addr);
    let err = provider
        .fetch_raw(&Symbol::parse("BTC").unwrap(), Interval::Hour1, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Network(_)));
    assert!(err.is_retryable());
}
