use thiserror::Error;

/// # Summary
/// 缓存域错误枚举，处理序列化、键模式及底层存储故障。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 管线层对任何 `CacheError` 都只降级为重新计算，绝不中断请求。
#[derive(Error, Debug)]
pub enum CacheError {
    // 数据序列化失败
    #[error("Serialize error: {0}")]
    Serialize(String),
    // 数据反序列化失败（通常是缓存内容与当前结构不兼容）
    #[error("Deserialize error: {0}")]
    Deserialize(String),
    // keys 查询模式非法
    #[error("Invalid key pattern: {0}")]
    Pattern(String),
    // 底层存储引擎故障或不可用
    #[error("Storage error: {0}")]
    Storage(String),
}
