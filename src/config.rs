//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL_MS};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of keys tracked by the cache index
    pub capacity: usize,
    /// Default entry TTL in milliseconds
    pub default_ttl_ms: i64,
    /// Default wait budget for races in milliseconds
    pub wait_ms: u64,
    /// Background refresh task interval in seconds
    pub refresh_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RACE_CACHE_CAPACITY` - Maximum tracked keys (default: 99)
    /// - `RACE_CACHE_TTL_MS` - Default entry TTL in ms (default: one year)
    /// - `RACE_CACHE_WAIT_MS` - Default race wait budget in ms (default: 0)
    /// - `RACE_CACHE_REFRESH_INTERVAL` - Refresh frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        Self {
            capacity: env::var("RACE_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            default_ttl_ms: env::var("RACE_CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_MS),
            wait_ms: env::var("RACE_CACHE_WAIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            refresh_interval: env::var("RACE_CACHE_REFRESH_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl_ms: DEFAULT_TTL_MS,
            wait_ms: 0,
            refresh_interval: 1,
        }
    }
}
