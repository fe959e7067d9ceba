//! Pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PoolError, Result};

/// Environment variable for the pool name
pub const ENV_NAME: &str = "BATCHPOOL_NAME";
/// Environment variable for the worker count
pub const ENV_WORKERS: &str = "BATCHPOOL_WORKERS";
/// Environment variable for the batch size
pub const ENV_TASKS: &str = "BATCHPOOL_TASKS";
/// Environment variable for the per-task timeout in milliseconds
pub const ENV_TASK_TIMEOUT_MS: &str = "BATCHPOOL_TASK_TIMEOUT_MS";

/// Smallest non-zero task timeout; timers fire on millisecond ticks
pub const MIN_TASK_TIMEOUT: Duration = Duration::from_millis(1);

/// Pool configuration
///
/// Fixed at construction; the pool never rescales or resizes its batch.
///
/// # Example
///
/// ```
/// use batchpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new(4, 50, Duration::from_secs(2))
///     .with_name("ingest");
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    /// Pool name, used in log spans (generated if not provided)
    pub name: String,

    /// Number of concurrent workers
    pub worker_count: usize,

    /// Number of tasks in the batch; also the capacity of both conduits
    pub task_count: usize,

    /// Maximum time a worker waits for one task's execution
    #[serde(with = "duration_millis")]
    pub task_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: format!("pool-{}", Uuid::now_v7()),
            worker_count: 4,
            task_count: 50,
            task_timeout: Duration::from_secs(2),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration
    pub fn new(worker_count: usize, task_count: usize, task_timeout: Duration) -> Self {
        Self {
            worker_count,
            task_count,
            task_timeout,
            ..Default::default()
        }
    }

    /// Load configuration from `BATCHPOOL_*` environment variables
    ///
    /// Unset variables keep their defaults; unparseable values are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_NAME) {
            config.name = name;
        }
        if let Some(workers) = parse_var(&lookup, ENV_WORKERS)? {
            config.worker_count = workers;
        }
        if let Some(tasks) = parse_var(&lookup, ENV_TASKS)? {
            config.task_count = tasks;
        }
        if let Some(millis) = parse_var::<u64, _>(&lookup, ENV_TASK_TIMEOUT_MS)? {
            config.task_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the worker count
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the batch size
    pub fn with_task_count(mut self, count: usize) -> Self {
        self.task_count = count;
        self
    }

    /// Set the per-task timeout
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// A zero timeout is accepted and times out every task. Other timeouts
    /// must be at least [`MIN_TASK_TIMEOUT`].
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(PoolError::InvalidConfig(
                "worker_count must be at least 1".into(),
            ));
        }
        if self.task_count == 0 {
            return Err(PoolError::InvalidConfig(
                "task_count must be at least 1".into(),
            ));
        }
        if !self.task_timeout.is_zero() && self.task_timeout < MIN_TASK_TIMEOUT {
            return Err(PoolError::InvalidConfig(format!(
                "task_timeout must be zero or at least {}ms, got {:?}",
                MIN_TASK_TIMEOUT.as_millis(),
                self.task_timeout
            )));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| PoolError::InvalidConfig(format!("{key}={raw:?}: {e}"))),
        None => Ok(None),
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert!(config.name.starts_with("pool-"));
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.task_count, 50);
        assert_eq!(config.task_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builder() {
        let config = PoolConfig::new(2, 10, Duration::from_millis(500))
            .with_name("builder")
            .with_worker_count(8)
            .with_task_count(100)
            .with_task_timeout(Duration::from_secs(1));

        assert_eq!(config.name, "builder");
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.task_count, 100);
        assert_eq!(config.task_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_zero_counts() {
        let config = PoolConfig::new(0, 10, Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(PoolError::InvalidConfig(_))));

        let config = PoolConfig::new(1, 0, Duration::from_secs(1));
        assert!(matches!(config.validate(), Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_allows_zero_timeout() {
        let config = PoolConfig::new(1, 1, Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_sub_millisecond_timeout() {
        for micros in [1, 10, 999] {
            let config = PoolConfig::new(1, 1, Duration::from_micros(micros));
            assert!(matches!(config.validate(), Err(PoolError::InvalidConfig(_))));
        }

        let config = PoolConfig::new(1, 1, MIN_TASK_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let config = PoolConfig::from_lookup(lookup_from(&[
            (ENV_NAME, "env-pool"),
            (ENV_WORKERS, "3"),
            (ENV_TASKS, " 12 "),
            (ENV_TASK_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.name, "env-pool");
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.task_count, 12);
        assert_eq!(config.task_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_from_lookup_keeps_defaults_when_unset() {
        let config = PoolConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.task_count, 50);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = PoolConfig::from_lookup(lookup_from(&[(ENV_WORKERS, "many")]));
        match result {
            Err(PoolError::InvalidConfig(message)) => {
                assert!(message.contains(ENV_WORKERS));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = PoolConfig::new(4, 50, Duration::from_millis(1500)).with_name("serde");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["task_timeout"], 1500);

        let parsed: PoolConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config, parsed);
    }
}
