//! # candela-pipeline
//!
//! 将归一化、质量评估、增强、规格构造与渲染串联为完整管线，
//! 并在数据抓取与图片渲染前各加一层 get-or-compute 缓存。

pub mod artifact;
pub mod error;
pub mod outcome;
pub mod retry;
pub mod service;
