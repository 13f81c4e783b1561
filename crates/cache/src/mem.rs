use async_trait::async_trait;
use candela_core::cache::error::CacheError;
use candela_core::cache::port::{Cache, key_matches};
use candela_core::common::time::{RealTimeProvider, TimeProvider};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// 带过期时间的存储条目。
struct Entry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// # Summary
/// 基于 DashMap 的内存缓存实现，支持逐条 TTL。
///
/// # Invariants
/// - 所有操作均通过并发哈希表 `DashMap` 执行，保证多线程安全。
/// - 过期采用惰性清理：读取或列举时发现过期即移除。
/// - 当前时间来自注入的 `TimeProvider`，测试可用虚拟时钟控制过期。
pub struct MemCache {
    // 线程安全的 KV 存储容器
    storage: DashMap<String, Entry>,
    // 过期判断所用的时钟
    clock: Arc<dyn TimeProvider>,
}

impl MemCache {
    /// # Summary
    /// 使用系统时钟创建 MemCache。
    pub fn new() -> Self {
        Self::with_clock(Arc::new(RealTimeProvider))
    }

    /// # Summary
    /// 使用指定时钟创建 MemCache。
    ///
    /// # Arguments
    /// * `clock`: 时间供给器，例如测试中的 `FakeClockProvider`。
    ///
    /// # Returns
    /// * `Self` - 初始化的缓存实例。
    pub fn with_clock(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            storage: DashMap::new(),
            clock,
        }
    }

    /// 当前存活的条目数（不触发清理）。
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.storage
            .iter()
            .filter(|entry| entry.value().expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Summary
    /// 主动清理所有过期条目。
    ///
    /// # Returns
    /// 被移除的条目数。
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.storage.len();
        self.storage.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.storage.len())
    }
}

impl Default for MemCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemCache {
    /// # Summary
    /// 设置原始字节数据。
    ///
    /// # Logic
    /// 1. 以当前时钟加 TTL 计算过期时刻，超出可表示范围时返回 `Storage` 错误。
    /// 2. 插入哈希表，若存在同名 Key 则覆盖（最后写入者生效）。
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Storage(format!("TTL out of range: {}", e)))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CacheError::Storage(format!("TTL {} overflows expiry time", ttl)))?;
        self.storage
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Logic
    /// 1. 检索 Key 对应条目。
    /// 2. 已过期则移除并返回 None，否则克隆数据返回。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = self.clock.now();
        let expired = match self.storage.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if !expired {
            return Ok(None);
        }

        trace!("MemCache: evicting expired key {}", key);
        self.storage
            .remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    /// # Summary
    /// 删除指定键。无论键是否存在均返回 Ok。
    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove(key);
        Ok(())
    }

    /// # Summary
    /// 按 `*` 通配模式列出存活键。
    ///
    /// # Logic
    /// 1. 空模式视为非法。
    /// 2. 遍历哈希表，跳过已过期条目。
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        if pattern.is_empty() {
            return Err(CacheError::Pattern("empty pattern".to_string()));
        }
        let now = self.clock.now();
        Ok(self
            .storage
            .iter()
            .filter(|entry| entry.value().expires_at > now && key_matches(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }
}
