//! # candela-render
//!
//! 图表渲染服务的 HTTP 适配器。

pub mod document;
pub mod http;
