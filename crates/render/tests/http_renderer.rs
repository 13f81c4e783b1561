use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use candela_core::chart::entity::{
    AxisRange, ChartSeries, ChartSpecification, ColorPolicy, Dimensions, OhlcPoint, Theme,
    TimeAxis, TimeUnit,
};
use candela_core::chart::error::RenderError;
use candela_core::chart::port::ChartRenderer;
use candela_core::config::RenderConfig;
use candela_render::http::HttpChartRenderer;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

// 帮助函数：在随机端口启动模拟渲染服务
async fn spawn_renderer(router: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    Ok(addr)
}

fn renderer_for(base_url: String, timeout_secs: u64) -> HttpChartRenderer {
    HttpChartRenderer::new(&RenderConfig {
        base_url,
        timeout_secs,
        ..RenderConfig::default()
    })
    .unwrap()
}

fn sample_spec() -> ChartSpecification {
    ChartSpecification {
        title: "BTC 1h".to_string(),
        series: ChartSeries::Candlestick(vec![OhlcPoint {
            x: 1_700_000_000_000,
            o: 50_000.0,
            h: 50_500.0,
            l: 49_800.0,
            c: 50_200.0,
        }]),
        y_axis: AxisRange {
            min: 49_730.0,
            max: 50_570.0,
        },
        x_axis: TimeAxis {
            unit: TimeUnit::Hour,
            tick_format: "HH:00".to_string(),
            label_format: "%H:00".to_string(),
            max_ticks: 10,
        },
        color_policy: ColorPolicy::default(),
        dimensions: Dimensions::default(),
        theme: Theme::Dark,
    }
}

type Captured = Arc<Mutex<Option<Value>>>;

async fn capture_chart(State(captured): State<Captured>, Json(body): Json<Value>) -> impl IntoResponse {
    *captured.lock().unwrap() = Some(body);
    ([(header::CONTENT_TYPE, "image/png")], PNG_MAGIC.to_vec())
}

#[tokio::test]
async fn test_render_success_posts_document() -> anyhow::Result<()> {
    let captured: Captured = Arc::new(Mutex::new(None));
    let router = Router::new()
        .route("/chart", post(capture_chart))
        .with_state(captured.clone());
    let addr = spawn_renderer(router).await?;

    let image = renderer_for(addr, 5).render(&sample_spec()).await?;
    assert_eq!(image.bytes, PNG_MAGIC);
    assert_eq!(image.content_type, "image/png");

    let body = captured.lock().unwrap().take().unwrap();
    assert_eq!(body["width"], 800);
    assert_eq!(body["height"], 400);
    assert_eq!(body["backgroundColor"], "#131722");
    assert_eq!(body["chart"]["type"], "candlestick");
    assert_eq!(body["chart"]["options"]["scales"]["y"]["max"], 50_570.0);
    Ok(())
}

#[tokio::test]
async fn test_render_rate_limited() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/chart",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded") }),
    );
    let addr = spawn_renderer(router).await?;

    let err = renderer_for(addr, 5).render(&sample_spec()).await.unwrap_err();
    assert!(matches!(err, RenderError::RateLimited(_)));
    assert!(err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_render_server_error_and_not_found() -> anyhow::Result<()> {
    let router = Router::new()
        .route(
            "/chart",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let addr = spawn_renderer(router).await?;
    let err = renderer_for(addr.clone(), 5).render(&sample_spec()).await.unwrap_err();
    assert!(matches!(err, RenderError::Service(_)));

    // 未注册的路径返回 404
    let err = renderer_for(format!("{}/missing", addr), 5)
        .render(&sample_spec())
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::NotFound(_)));
    assert!(!err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_render_timeout() -> anyhow::Result<()> {
    let router = Router::new().route(
        "/chart",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            PNG_MAGIC.to_vec()
        }),
    );
    let addr = spawn_renderer(router).await?;

    let err = renderer_for(addr, 1).render(&sample_spec()).await.unwrap_err();
    assert!(matches!(err, RenderError::Timeout(_)));
    Ok(())
}

#[tokio::test]
async fn test_render_empty_body_is_unknown() -> anyhow::Result<()> {
    let router = Router::new().route("/chart", post(|| async { StatusCode::OK }));
    let addr = spawn_renderer(router).await?;

    let err = renderer_for(addr, 5).render(&sample_spec()).await.unwrap_err();
    assert!(matches!(err, RenderError::Unknown(_)));
    Ok(())
}
