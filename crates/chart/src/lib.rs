//! # candela-chart
//!
//! 管线中的纯计算阶段：数据质量评估、平 K 线增强、图表规格构造与文本降级渲染。
//! 本 crate 不做任何 I/O。

pub mod enhance;
pub mod quality;
pub mod sparkline;
pub mod spec;
