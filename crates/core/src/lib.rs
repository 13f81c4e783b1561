//! # candela-core
//!
//! 行情 K 线渲染管线的领域层：实体、错误枚举、端口 (Port) 与全局配置。
//! 所有适配器 crate 只依赖本 crate，具体实现由组合根注入。

pub mod cache;
pub mod chart;
pub mod common;
pub mod config;
pub mod market;
pub mod quality;

/// # Summary
/// 为 reqwest 的 `rustls-no-provider` 后端安装进程级 ring 加密提供者。
///
/// # Logic
/// 1. 尝试安装 ring 默认提供者。
/// 2. 若已被其他组件安装，则忽略并记录调试日志。
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }
}
