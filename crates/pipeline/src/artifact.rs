use candela_core::cache::port::{Cache, CacheExt};
use candela_core::common::time::TimeProvider;
use candela_core::common::{Interval, Symbol};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// K 线窗口缓存键：`window:{SYMBOL}_{interval}_{count}`
pub fn window_key(symbol: &Symbol, interval: Interval, count: usize) -> String {
    format!("window:{}_{}_{}", symbol, interval, count)
}

/// 渲染图片缓存键：`image:{SYMBOL}_{interval}`
pub fn image_key(symbol: &Symbol, interval: Interval) -> String {
    format!("image:{}_{}", symbol, interval)
}

/// # Summary
/// 缓存中实际存放的信封，附带写入时间与 TTL。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope<T> {
    value: T,
    cached_at: DateTime<Utc>,
    ttl_secs: u64,
}

/// # Summary
/// get-or-compute 的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct CachedArtifact<T> {
    pub value: T,
    // 首次计算完成的时间
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
    pub is_cache_hit: bool,
}

// 在途锁的持有凭证，析构时清理 map 中无人使用的锁，取消请求同样生效
struct InflightSlot<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> InflightSlot<'a> {
    fn acquire(map: &'a DashMap<String, Arc<Mutex<()>>>, key: &'a str) -> Self {
        let lock = map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self { map, key, lock }
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        // 仅剩 map 与本凭证持有时移除
        self.map
            .remove_if(self.key, |_, entry| Arc::strong_count(entry) <= 2);
    }
}

/// # Summary
/// 管线两层缓存的统一入口：命中即返回，未命中则计算并写回。
///
/// # Invariants
/// - 同一 Key 的并发未命中只触发一次计算，其余调用等待后读取结果。
/// - 计算失败不写入缓存。
/// - 底层存储故障只记录告警，退化为每次重新计算。
pub struct ArtifactCache {
    cache: Arc<dyn Cache>,
    clock: Arc<dyn TimeProvider>,
    // 按 Key 划分的在途计算锁
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl ArtifactCache {
    pub fn new(cache: Arc<dyn Cache>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            cache,
            clock,
            inflight: DashMap::new(),
        }
    }

    async fn lookup<T>(&self, key: &str) -> Option<CachedArtifact<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.cache.get::<Envelope<T>>(key).await {
            Ok(Some(envelope)) => Some(CachedArtifact {
                value: envelope.value,
                cached_at: envelope.cached_at,
                ttl: Duration::from_secs(envelope.ttl_secs),
                is_cache_hit: true,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!("ArtifactCache: read of '{}' failed, recomputing: {}", key, e);
                None
            }
        }
    }

    /// # Summary
    /// 读取缓存，未命中时计算并写回。
    ///
    /// # Logic
    /// 1. 命中直接返回，`is_cache_hit = true`。
    /// 2. 未命中时获取该 Key 的在途锁，持锁后再次检查缓存。
    /// 3. 仍未命中则执行 `compute`；成功时写入缓存，写入失败仅告警。
    /// 4. 释放锁后（包括调用被取消时），若无其他等待者则清理在途锁。
    ///
    /// # Arguments
    /// * `key`: 缓存键。
    /// * `ttl`: 写入时的存活时长。
    /// * `compute`: 未命中时执行的计算。
    ///
    /// # Returns
    /// 计算或缓存中的值；计算失败时原样返回其错误。
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<CachedArtifact<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.lookup(key).await {
            debug!("ArtifactCache: hit '{}'", key);
            return Ok(hit);
        }

        let slot = InflightSlot::acquire(&self.inflight, key);
        let _guard = slot.lock.lock().await;
        match self.lookup(key).await {
            Some(hit) => {
                debug!("ArtifactCache: '{}' filled by a concurrent request", key);
                Ok(hit)
            }
            None => self.compute_and_store(key, ttl, compute).await,
        }
    }

    async fn compute_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<CachedArtifact<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!("ArtifactCache: miss '{}', computing", key);
        let value = compute().await?;
        let cached_at = self.clock.now();

        let envelope = Envelope {
            value,
            cached_at,
            ttl_secs: ttl.as_secs(),
        };
        if let Err(e) = self.cache.set(key, &envelope, ttl).await {
            warn!("ArtifactCache: write of '{}' failed: {}", key, e);
        }

        Ok(CachedArtifact {
            value: envelope.value,
            cached_at,
            ttl,
            is_cache_hit: false,
        })
    }

    /// # Summary
    /// 删除所有匹配模式的键。
    ///
    /// # Returns
    /// 实际删除的键数量；存储故障只告警并计入未删除。
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let keys = match self.cache.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("ArtifactCache: listing '{}' failed: {}", pattern, e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            match self.cache.del(&key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("ArtifactCache: delete of '{}' failed: {}", key, e),
            }
        }
        debug!("ArtifactCache: invalidated {} keys for '{}'", removed, pattern);
        removed
    }
}
