//! Redis client used by the Redis cache backend
//!
//! Wraps the `redis` crate's self-healing connections: a
//! [`ConnectionManager`] for a single node and a cluster connection for Redis
//! Cluster. Both reconnect on their own. The connection is opened on the
//! first command, so building a client never touches the network.

use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{AsyncCommands, RedisError, RedisResult};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::{RedisConfig, RedisMode};

// == Redis Commands ==
/// The subset of Redis used by the cache adapter.
#[async_trait]
pub trait RedisCommands: Send + Sync {
    /// `GET key`; `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> RedisResult<Option<Vec<u8>>>;

    /// `SET key value` expiring after `ttl`, or never when `ttl` is zero.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> RedisResult<()>;

    /// `DEL key`
    async fn del(&self, key: &str) -> RedisResult<()>;

    fn mode(&self) -> RedisMode;
}

#[derive(Clone)]
enum Connection {
    Single(ConnectionManager),
    Cluster(ClusterConnection),
}

/// Expiration argument of a `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    Never,
    Seconds(u64),
    Millis(u64),
}

impl Expiry {
    /// Whole-second TTLs map to `EX`, anything else to `PX` rounded up to 1 ms.
    fn from_ttl(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiry::Never
        } else if ttl.subsec_nanos() == 0 {
            Expiry::Seconds(ttl.as_secs())
        } else {
            Expiry::Millis((ttl.as_millis() as u64).max(1))
        }
    }
}

// == Redis Client ==
pub struct RedisClient {
    config: RedisConfig,
    conn: OnceCell<Connection>,
}

impl RedisClient {
    /// Client for a single Redis node.
    pub fn new(config: &RedisConfig) -> Self {
        Self::with_mode(config, RedisMode::Redis)
    }

    /// Client for a Redis Cluster seeded with the configured address.
    pub fn new_cluster(config: &RedisConfig) -> Self {
        Self::with_mode(config, RedisMode::Cluster)
    }

    /// Client matching the configured mode.
    pub fn from_config(config: &RedisConfig) -> Self {
        Self::with_mode(config, config.mode)
    }

    fn with_mode(config: &RedisConfig, mode: RedisMode) -> Self {
        Self {
            config: RedisConfig {
                mode,
                ..config.clone()
            },
            conn: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    fn node_url(&self) -> String {
        if self.config.address.contains("://") {
            self.config.address.clone()
        } else {
            format!("redis://{}", self.config.address)
        }
    }

    /// Reply timeout handed to the connection: the larger of read and write.
    fn response_timeout(&self) -> Duration {
        self.config.read_timeout.max(self.config.write_timeout)
    }

    async fn connect(&self) -> RedisResult<Connection> {
        let url = self.node_url();
        debug!(address = %self.config.address, mode = %self.config.mode, "Opening Redis connection");

        match self.config.mode {
            RedisMode::Redis => {
                let client = redis::Client::open(url.as_str())?;
                let mut options = ConnectionManagerConfig::new()
                    .set_number_of_retries(self.config.max_retries as usize);
                if !self.config.dial_timeout.is_zero() {
                    options = options.set_connection_timeout(self.config.dial_timeout);
                }
                if !self.response_timeout().is_zero() {
                    options = options.set_response_timeout(self.response_timeout());
                }

                let manager = ConnectionManager::new_with_config(client, options).await?;
                Ok(Connection::Single(manager))
            }
            RedisMode::Cluster => {
                let mut builder =
                    ClusterClientBuilder::new(vec![url]).retries(self.config.max_retries);
                if !self.config.dial_timeout.is_zero() {
                    builder = builder.connection_timeout(self.config.dial_timeout);
                }
                if !self.response_timeout().is_zero() {
                    builder = builder.response_timeout(self.response_timeout());
                }

                let conn = builder.build()?.get_async_connection().await?;
                Ok(Connection::Cluster(conn))
            }
        }
    }

    /// Shared connection, opened by the first caller that needs it.
    ///
    /// A failed attempt leaves nothing behind; the next command dials again.
    async fn connection(&self) -> RedisResult<Connection> {
        self.conn.get_or_try_init(|| self.connect()).await.cloned()
    }

    /// Runs `command` on the shared connection.
    ///
    /// Every caller gets its own deadline of dial timeout plus `reply_timeout`,
    /// including the time spent waiting for another caller's dial.
    async fn run<T, F, Fut>(
        &self,
        reply_timeout: Duration,
        message: &'static str,
        command: F,
    ) -> RedisResult<T>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let deadline = self.config.dial_timeout + reply_timeout;
        within(deadline, message, async {
            let conn = self.connection().await?;
            command(conn).await
        })
        .await
    }
}

#[async_trait]
impl RedisCommands for RedisClient {
    async fn get(&self, key: &str) -> RedisResult<Option<Vec<u8>>> {
        self.run(
            self.config.read_timeout,
            "timed out reading from Redis",
            |conn| async move {
                match conn {
                    Connection::Single(conn) => get_value(conn, key).await,
                    Connection::Cluster(conn) => get_value(conn, key).await,
                }
            },
        )
        .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> RedisResult<()> {
        let expiry = Expiry::from_ttl(ttl);
        self.run(
            self.config.write_timeout,
            "timed out writing to Redis",
            |conn| async move {
                match conn {
                    Connection::Single(conn) => set_value(conn, key, value, expiry).await,
                    Connection::Cluster(conn) => set_value(conn, key, value, expiry).await,
                }
            },
        )
        .await
    }

    async fn del(&self, key: &str) -> RedisResult<()> {
        self.run(
            self.config.write_timeout,
            "timed out deleting from Redis",
            |conn| async move {
                match conn {
                    Connection::Single(conn) => del_value(conn, key).await,
                    Connection::Cluster(conn) => del_value(conn, key).await,
                }
            },
        )
        .await
    }

    fn mode(&self) -> RedisMode {
        self.config.mode
    }
}

// == Commands ==
async fn get_value<C: AsyncCommands>(mut conn: C, key: &str) -> RedisResult<Option<Vec<u8>>> {
    conn.get(key).await
}

async fn set_value<C: AsyncCommands>(
    mut conn: C,
    key: &str,
    value: &[u8],
    expiry: Expiry,
) -> RedisResult<()> {
    match expiry {
        Expiry::Never => conn.set::<_, _, ()>(key, value).await,
        Expiry::Seconds(seconds) => conn.set_ex::<_, _, ()>(key, value, seconds).await,
        Expiry::Millis(millis) => conn.pset_ex::<_, _, ()>(key, value, millis).await,
    }
}

async fn del_value<C: AsyncCommands>(mut conn: C, key: &str) -> RedisResult<()> {
    conn.del::<_, ()>(key).await
}

/// Fails with a timeout error carrying `message` once `limit` elapses.
async fn within<T, F>(limit: Duration, message: &'static str, fut: F) -> RedisResult<T>
where
    F: Future<Output = RedisResult<T>>,
{
    if limit.is_zero() {
        return fut.await;
    }
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RedisError::from(io::Error::new(io::ErrorKind::TimedOut, message))),
    }
}
