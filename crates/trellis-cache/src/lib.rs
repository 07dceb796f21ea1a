//! # Trellis Cache
//!
//! Redis connection management and the handful of typed operations the
//! front door needs (session caching, short-lived lookups).

pub mod client;

pub use client::{delete, get_json, init_pool, set_json_ex, CacheError, CacheResult, RedisPool};
