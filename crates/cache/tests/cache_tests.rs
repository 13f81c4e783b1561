use candela_cache::mem::MemCache;
use candela_core::cache::error::CacheError;
use candela_core::cache::port::{Cache, CacheExt};
use candela_core::common::time::FakeClockProvider;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestItem {
    id: u32,
    name: String,
}

const TTL: Duration = Duration::from_secs(300);

fn fake_clock() -> Arc<FakeClockProvider> {
    Arc::new(FakeClockProvider::new(
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    ))
}

#[tokio::test]
async fn test_mem_cache_raw_ops() {
    let cache = MemCache::new();
    let key = "raw_key";
    let value = vec![1, 2, 3, 4];

    // 测试存取
    cache.set_raw(key, value.clone(), TTL).await.unwrap();
    let result = cache.get_raw(key).await.unwrap().unwrap();
    assert_eq!(result, value);

    // 测试删除
    cache.del(key).await.unwrap();
    let result = cache.get_raw(key).await.unwrap();
    assert!(result.is_none());

    // 删除不存在的键同样成功
    cache.del(key).await.unwrap();
}

#[tokio::test]
async fn test_mem_cache_typed_ops() {
    let cache = MemCache::new();
    let item = TestItem {
        id: 42,
        name: "Candela".to_string(),
    };

    cache.set("typed_key", &item, TTL).await.unwrap();
    let result: TestItem = cache.get("typed_key").await.unwrap().unwrap();
    assert_eq!(result, item);
}

#[tokio::test]
async fn test_mem_cache_ttl_expiry() {
    let clock = fake_clock();
    let cache = MemCache::with_clock(clock.clone());

    cache.set_raw("k", vec![9], TTL).await.unwrap();

    clock.advance(chrono::Duration::seconds(299));
    assert_eq!(cache.get_raw("k").await.unwrap(), Some(vec![9]));

    clock.advance(chrono::Duration::seconds(1));
    assert!(cache.get_raw("k").await.unwrap().is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_mem_cache_overwrite_refreshes_ttl() {
    let clock = fake_clock();
    let cache = MemCache::with_clock(clock.clone());

    cache.set_raw("k", vec![1], TTL).await.unwrap();
    clock.advance(chrono::Duration::seconds(200));
    cache.set_raw("k", vec![2], TTL).await.unwrap();
    clock.advance(chrono::Duration::seconds(200));

    assert_eq!(cache.get_raw("k").await.unwrap(), Some(vec![2]));
}

#[tokio::test]
async fn test_mem_cache_keys_pattern() {
    let clock = fake_clock();
    let cache = MemCache::with_clock(clock.clone());

    cache.set_raw("image:BTC_1h", vec![1], TTL).await.unwrap();
    cache.set_raw("image:BTC_1d", vec![1], TTL).await.unwrap();
    cache.set_raw("image:ETH_1h", vec![1], TTL).await.unwrap();
    cache
        .set_raw("window:BTC_1h_20", vec![1], Duration::from_secs(10))
        .await
        .unwrap();

    let mut keys = cache.keys("image:BTC_*").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["image:BTC_1d", "image:BTC_1h"]);

    assert_eq!(cache.keys("*BTC_1h*").await.unwrap().len(), 2);

    // 过期条目不出现在 keys 结果中
    clock.advance(chrono::Duration::seconds(11));
    assert_eq!(cache.keys("window:*").await.unwrap().len(), 0);
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 3);

    assert!(cache.keys("").await.is_err());
}

#[tokio::test]
async fn test_mem_cache_rejects_unrepresentable_ttl() {
    let cache = MemCache::with_clock(fake_clock());
    // 约一百万年，可转换为 chrono::Duration 但超出 DateTime 范围
    let huge = Duration::from_secs(1_000_000 * 365 * 86_400);

    let err = cache.set_raw("forever", vec![1], huge).await.unwrap_err();
    assert!(matches!(err, CacheError::Storage(_)));
    assert!(cache.get_raw("forever").await.unwrap().is_none());
    assert!(cache.is_empty());

    // 超出 chrono::Duration 范围同样报错
    let err = cache.set_raw("forever", vec![1], Duration::MAX).await.unwrap_err();
    assert!(matches!(err, CacheError::Storage(_)));
}
