/// Worker configuration
///
/// Broker settings come from `userdir_shared::redis::RedisConfig::from_env`.
///
/// # Environment Variables
///
/// - `TASK_QUEUE_NAME`: queue to consume (default: default)
/// - `WORKER_CONCURRENCY`: tasks executing at once, 1 to 1024 (default: 4)
/// - `WORKER_POLL_SECS`: how long one dequeue call blocks (default: 5)
/// - `WORKER_SHUTDOWN_GRACE_SECS`: wait for in-flight tasks on shutdown (default: 30)
/// - `WORKER_RECORD_RESULTS`: store a `TaskOutcome` per task (default: true)
/// - `RESULT_TTL_SECS`: lifetime of stored outcomes (default: 86400)

use std::env;
use std::str::FromStr;
use std::time::Duration;
use userdir_shared::queue::redis_backend::DEFAULT_RESULT_TTL_SECS;

/// Upper bound on `WORKER_CONCURRENCY`
pub const MAX_CONCURRENCY: usize = 1024;

/// Worker loop settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue_name: String,

    /// Maximum tasks executing at once; 1 gives sequential execution
    pub concurrency: usize,

    /// Seconds a single dequeue call may block
    pub poll_secs: u64,

    pub shutdown_grace_secs: u64,
    pub record_results: bool,
    pub result_ttl_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            queue_name: "default".to_string(),
            concurrency: 4,
            poll_secs: 5,
            shutdown_grace_secs: 30,
            record_results: true,
            result_ttl_secs: DEFAULT_RESULT_TTL_SECS,
        }
    }
}

impl WorkerConfig {
    /// Loads the worker settings from the environment
    ///
    /// Unset variables fall back to [`WorkerConfig::default`]; set but
    /// unparsable ones are an error.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = WorkerConfig::default();
        let concurrency = check_concurrency(parse_var("WORKER_CONCURRENCY", defaults.concurrency)?)?;

        Ok(WorkerConfig {
            queue_name: env::var("TASK_QUEUE_NAME").unwrap_or(defaults.queue_name),
            concurrency,
            poll_secs: parse_var("WORKER_POLL_SECS", defaults.poll_secs)?.max(1),
            shutdown_grace_secs: parse_var(
                "WORKER_SHUTDOWN_GRACE_SECS",
                defaults.shutdown_grace_secs,
            )?,
            record_results: parse_var("WORKER_RECORD_RESULTS", defaults.record_results)?,
            result_ttl_secs: parse_var("RESULT_TTL_SECS", defaults.result_ttl_secs)?,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn check_concurrency(concurrency: usize) -> anyhow::Result<usize> {
    if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
        anyhow::bail!(
            "WORKER_CONCURRENCY must be between 1 and {}, got {}",
            MAX_CONCURRENCY,
            concurrency
        );
    }
    Ok(concurrency)
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.queue_name, "default");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(30));
        assert!(config.record_results);
        assert_eq!(config.result_ttl_secs, 86_400);
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(check_concurrency(0).is_err());
        assert_eq!(check_concurrency(1).unwrap(), 1);
        assert_eq!(check_concurrency(MAX_CONCURRENCY).unwrap(), MAX_CONCURRENCY);
        assert!(check_concurrency(MAX_CONCURRENCY + 1).is_err());
        assert!(check_concurrency(usize::MAX).is_err());
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let value: u64 = parse_var("USERDIR_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
