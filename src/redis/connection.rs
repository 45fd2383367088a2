//! Redis connection pool with retry logic
//!
//! Wraps a single multiplexed connection (Redis multiplexes requests over
//! it) behind a semaphore that bounds the number of in-flight operations.
//! Failed commands can be retried with exponential backoff, but only for
//! connection-level failures and only when the policy allows it; the default
//! policy does not retry, so store failures reach the finisher unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use kuba_query::redis::{RedisConfig, RedisPool};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RedisConfig::with_url("redis://localhost:6379").pool_size(8);
//! let pool = RedisPool::new(config).await?;
//! pool.ping().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::StoreError;

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};

use super::util::safe_redis_error;

/// Configuration for the Redis connection pool
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Redis server URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Maximum number of concurrent operations
    /// Default: 16
    pub pool_size: u32,

    /// Timeout for establishing a connection
    /// Default: 5 seconds
    pub connection_timeout: Duration,

    /// Optional timeout for each command or batch
    /// Default: none, a hung command blocks the caller
    pub command_timeout: Option<Duration>,

    /// Retry policy for connection-level failures
    pub retry_policy: RetryPolicy,

    /// Enable TLS for connections
    /// Default: false
    pub tls_enabled: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
            connection_timeout: Duration::from_secs(5),
            command_timeout: None,
            retry_policy: RetryPolicy::default(),
            tls_enabled: false,
        }
    }
}

impl RedisConfig {
    /// Create a new config with the specified URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the pool size
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set a per-command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Set the retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Enable or disable TLS (`rediss://`)
    ///
    /// Requires the `redis-tls` feature.
    pub fn tls(mut self, enabled: bool) -> Self {
        self.tls_enabled = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if self.pool_size == 0 {
            return Err("Pool size must be greater than 0".to_string());
        }
        if self.pool_size > 1000 {
            return Err("Pool size cannot exceed 1000".to_string());
        }

        #[cfg(not(feature = "redis-tls"))]
        if self.tls_enabled {
            return Err(
                "TLS is enabled but the 'redis-tls' feature is not compiled. \
                 Enable it with: cargo build --features redis-tls"
                    .to_string(),
            );
        }

        if self.tls_enabled != self.url.starts_with("rediss://") {
            return Err(format!(
                "URL scheme does not match TLS setting (tls = {}); use 'rediss://' only with TLS",
                self.tls_enabled
            ));
        }

        Ok(())
    }
}

/// Retry policy with exponential backoff
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    /// Default: 0 (no retries)
    pub max_retries: u32,

    /// Initial delay between retries
    /// Default: 100ms
    pub initial_delay: Duration,

    /// Maximum delay between retries
    /// Default: 5 seconds
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    /// Default: 2.0
    pub multiplier: f64,

    /// Add up to 25% random jitter to delays
    /// Default: true
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay_ms = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            delay_ms * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Check if we should retry after the given attempt
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Pool counters
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Successful connections
    pub connections_created: AtomicU64,
    /// Commands (or batches) executed successfully
    pub commands_executed: AtomicU64,
    /// Commands (or batches) that failed
    pub command_failures: AtomicU64,
    /// Retry attempts
    pub retries: AtomicU64,
    /// Total latency in microseconds
    pub total_latency_us: AtomicU64,
}

impl PoolMetrics {
    fn record_command(&self, latency: Duration) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    /// Snapshot of the counters
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        let executed = self.commands_executed.load(Ordering::Relaxed);
        let total = self.total_latency_us.load(Ordering::Relaxed);
        PoolMetricsSnapshot {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            commands_executed: executed,
            command_failures: self.command_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            average_latency_us: if executed == 0 {
                0.0
            } else {
                total as f64 / executed as f64
            },
        }
    }
}

/// Snapshot of pool metrics at a point in time
#[derive(Debug, Clone)]
pub struct PoolMetricsSnapshot {
    /// Connections created during the pool lifetime
    pub connections_created: u64,
    /// Commands executed through the pool
    pub commands_executed: u64,
    /// Command failures encountered
    pub command_failures: u64,
    /// Retry attempts made
    pub retries: u64,
    /// Average command latency in microseconds
    pub average_latency_us: f64,
}

/// Redis connection pool
pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    config: RedisConfig,
    metrics: Arc<PoolMetrics>,
    semaphore: Arc<Semaphore>,
}

impl RedisPool {
    /// Create a pool and establish the initial connection
    pub async fn new(config: RedisConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Connection)?;

        // Sanitized URL in errors to prevent credential leakage
        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(safe_redis_error(&config.url, &e)))?;

        let pool = Self {
            client,
            connection: RwLock::new(None),
            semaphore: Arc::new(Semaphore::new(config.pool_size as usize)),
            config,
            metrics: Arc::new(PoolMetrics::default()),
        };
        pool.connect().await?;

        debug!("Redis connection pool initialized");
        Ok(pool)
    }

    async fn connect(&self) -> Result<MultiplexedConnection, StoreError> {
        let start = Instant::now();

        let conn = tokio::time::timeout(
            self.config.connection_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::Connection("Connection timeout".to_string()))?
        .map_err(|e| StoreError::Connection(safe_redis_error(&self.config.url, &e)))?;

        *self.connection.write().await = Some(conn.clone());
        self.metrics
            .connections_created
            .fetch_add(1, Ordering::Relaxed);

        debug!("Redis connection established in {:?}", start.elapsed());
        Ok(conn)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let existing = self.connection.read().await.clone();
        match existing {
            Some(conn) => Ok(conn),
            None => self.connect().await,
        }
    }

    /// Run an operation on a pooled connection
    ///
    /// Connection-level failures are retried according to the retry policy;
    /// every other error is returned immediately.
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: Fn(MultiplexedConnection) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StoreError::Connection("Semaphore closed".to_string()))?;

        let mut attempt = 0;
        loop {
            let conn = self.connection().await?;
            let start = Instant::now();

            let result = match self.config.command_timeout {
                Some(limit) => match tokio::time::timeout(limit, f(conn)).await {
                    Ok(r) => r,
                    Err(_) => {
                        self.metrics.command_failures.fetch_add(1, Ordering::Relaxed);
                        return Err(StoreError::Timeout);
                    },
                },
                None => f(conn).await,
            };

            match result {
                Ok(value) => {
                    self.metrics.record_command(start.elapsed());
                    return Ok(value);
                },
                Err(e) => {
                    self.metrics.command_failures.fetch_add(1, Ordering::Relaxed);

                    if is_connection_error(&e) && self.config.retry_policy.should_retry(attempt) {
                        self.metrics.retries.fetch_add(1, Ordering::Relaxed);
                        let delay = self.config.retry_policy.delay_for_attempt(attempt);
                        warn!(
                            "Redis connection failed (attempt {}), retrying in {:?}",
                            attempt + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        *self.connection.write().await = None;
                        attempt += 1;
                        continue;
                    }

                    if is_connection_error(&e) {
                        return Err(StoreError::Connection(safe_redis_error(
                            &self.config.url,
                            &e,
                        )));
                    }
                    // Server-side replies carry no connection details
                    return Err(StoreError::Command(e.to_string()));
                },
            }
        }
    }

    /// Send a PING
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.execute(|mut conn| async move {
            redis::cmd("PING").query_async::<String>(&mut conn).await
        })
        .await
        .map(|_| ())
    }

    /// Get pool metrics
    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Get the pool configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

/// Errors that mean the connection itself is unusable
fn is_connection_error(e: &RedisError) -> bool {
    e.is_connection_dropped() || e.is_io_error() || e.is_connection_refusal()
}
