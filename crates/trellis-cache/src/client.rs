//! Redis connection pool management.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Cache error types.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Redis connection pool — ConnectionManager handles multiplexing internally.
/// It is Clone, so callers clone it to get a mutable handle for each operation.
pub type RedisPool = ConnectionManager;

/// Initialize a Redis connection pool from a URL.
///
/// Example URL: `redis://127.0.0.1:6379` (or `rediss://` for encrypted
/// transit).
pub async fn init_pool(redis_url: &str) -> CacheResult<RedisPool> {
    let client = redis::Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    tracing::info!("connected to Redis");
    Ok(manager)
}

/// Get a JSON value by key, `None` when absent.
pub async fn get_json<T: DeserializeOwned>(pool: &RedisPool, key: &str) -> CacheResult<Option<T>> {
    let mut conn = pool.clone();
    let raw: Option<String> = conn.get(key).await?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Set a JSON value with a TTL in seconds.
pub async fn set_json_ex<T: Serialize>(
    pool: &RedisPool,
    key: &str,
    value: &T,
    ttl_secs: u64,
) -> CacheResult<()> {
    let mut conn = pool.clone();
    let json = serde_json::to_string(value)?;
    conn.set_ex::<_, _, ()>(key, json, ttl_secs).await?;
    Ok(())
}

/// Delete a key; absent keys are not an error.
pub async fn delete(pool: &RedisPool, key: &str) -> CacheResult<()> {
    let mut conn = pool.clone();
    conn.del::<_, ()>(key).await?;
    Ok(())
}
