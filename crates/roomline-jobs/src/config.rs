//! Worker configuration.

use std::time::Duration;

/// Tuning knobs for the job worker loop.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// How often the worker polls `job_queue` for pending rows.
    pub poll_interval: Duration,

    /// Maximum rows pulled per poll.
    pub batch_size: u32,

    /// Jobs with `attempts >= max_attempts` are skipped and logged.
    pub max_attempts: i64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        JobsConfig {
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
            max_attempts: 10,
        }
    }
}

impl JobsConfig {
    /// Config suited to tests: tight polling, few retries.
    pub fn fast() -> Self {
        JobsConfig {
            poll_interval: Duration::from_millis(10),
            batch_size: 100,
            max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JobsConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_attempts, 10);
    }
}
