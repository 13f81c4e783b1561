//! # candela-feed
//!
//! 行情数据接入：原始记录的数值归一化、窗口构造，以及 HTTP 数据源适配器。

pub mod http;
pub mod normalize;
