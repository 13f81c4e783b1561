//! # candela-cache
//!
//! 缓存端口的内存实现。

pub mod mem;
