use std::time::Duration;

use crate::{common::log_warn, transport::Connect};

use super::Pool;

/// Default number of transport handles.
pub const DEFAULT_MAX_COUNT: usize = 10;

/// What [`Pool::acquire`] does when every handle is busy and the pool is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExhaustedPolicy {
    /// Queue the caller until a handle is released and log a warning.
    #[default]
    Wait,
    /// Lend the least recently returned busy handle and log a warning.
    ///
    /// The handle is then used by several callers concurrently.
    Share,
}

/// Pool configuration builder.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub(crate) max_count: usize,
    pub(crate) exhausted: ExhaustedPolicy,
    pub(crate) idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            exhausted: ExhaustedPolicy::Wait,
            idle_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Create config from environment variable.
    ///
    /// - `SERVICE_POOL_MAX_COUNT`, maximum handle count, defaults to 10, an
    ///   unparsable value falls back to 1
    /// - `SERVICE_POOL_IDLE_SECS`, close handle idle longer than this, unset means never
    pub fn from_env() -> PoolConfig {
        let max_count = match std::env::var("SERVICE_POOL_MAX_COUNT") {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(n) => n.max(1),
                Err(_) => {
                    log_warn!("invalid SERVICE_POOL_MAX_COUNT {value:?}, using 1");
                    1
                }
            },
            Err(_) => DEFAULT_MAX_COUNT,
        };

        let idle_timeout = std::env::var("SERVICE_POOL_IDLE_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs);

        Self { max_count, exhausted: ExhaustedPolicy::default(), idle_timeout }
    }

    /// Set max handle count, zero is treated as one.
    pub fn max_count(mut self, value: usize) -> Self {
        self.max_count = value.max(1);
        self
    }

    /// Set behavior when pool is exhausted.
    pub fn exhausted(mut self, policy: ExhaustedPolicy) -> Self {
        self.exhausted = policy;
        self
    }

    /// Close handles that stay idle longer than `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn get_max_count(&self) -> usize {
        self.max_count
    }

    pub fn get_exhausted(&self) -> ExhaustedPolicy {
        self.exhausted
    }

    /// Create the [`Pool`], this spawns the pool worker to the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of tokio runtime.
    pub fn build<C: Connect>(self, connector: C) -> Pool<C::Transport> {
        Pool::with_config(connector, self)
    }
}
