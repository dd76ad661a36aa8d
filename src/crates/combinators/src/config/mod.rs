//! Default policies and their environment layer
//!
//! [`CombinatorConfig`] collects the delays, attempt counts and limits used
//! by the `from_config` constructors. Hosts that want the values to be tunable
//! load it from environment variables under a prefix of their choosing:
//!
//! | Variable | Field |
//! |---|---|
//! | `{PREFIX}DEBOUNCE_MS` | `debounce_delay` |
//! | `{PREFIX}THROTTLE_MS` | `throttle_delay` |
//! | `{PREFIX}THROTTLE_LEADING` | `throttle_leading` |
//! | `{PREFIX}THROTTLE_TRAILING` | `throttle_trailing` |
//! | `{PREFIX}BATCH_MS` | `batch_delay` |
//! | `{PREFIX}RETRY_ATTEMPTS` | `retry_attempts` |
//! | `{PREFIX}RETRY_DELAY_MS` | `retry_delay` |
//! | `{PREFIX}FRAME_RATE` | `frame_rate` |
//! | `{PREFIX}MEMO_CAPACITY` | `memo_capacity` (`0` = unbounded) |
//! | `{PREFIX}CONCURRENCY_LIMIT` | `concurrency_limit` |
//!
//! # Example
//!
//! ```rust,ignore
//! use combinators::config::ConfigBuilder;
//! use combinators::{CombinatorConfig, Debounce};
//!
//! let config = CombinatorConfig::load("SEARCH_")?;
//! let on_input = Debounce::from_config(&config, |query: String| search(query))?;
//! ```

mod builder;
mod env;

pub use builder::ConfigBuilder;
pub use env::{
    build_env_key, get_env, get_env_bool, get_env_millis, get_env_parse, get_env_parse_or,
};

use crate::async_utils::retry::RetryPolicy;
use crate::memo::MemoOptions;
use crate::schedule::{FixedRateClock, ThrottleOptions};
use crate::{CombinatorError, Result};
use std::time::Duration;

/// Defaults shared by the combinator constructors
#[derive(Debug, Clone, PartialEq)]
pub struct CombinatorConfig {
    pub debounce_delay: Duration,
    pub throttle_delay: Duration,
    pub throttle_leading: bool,
    pub throttle_trailing: bool,
    pub batch_delay: Duration,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
    /// Frames per second for the fixed-rate frame clock
    pub frame_rate: u32,
    /// `None` means the memo cache is never trimmed
    pub memo_capacity: Option<usize>,
    pub concurrency_limit: usize,
}

impl Default for CombinatorConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(300),
            throttle_delay: Duration::from_millis(300),
            throttle_leading: true,
            throttle_trailing: true,
            batch_delay: Duration::from_millis(100),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            frame_rate: 60,
            memo_capacity: Some(1000),
            concurrency_limit: 4,
        }
    }
}

impl CombinatorConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(self)
    }

    pub fn throttle_options(&self) -> ThrottleOptions {
        ThrottleOptions {
            leading: self.throttle_leading,
            trailing: self.throttle_trailing,
        }
    }

    pub fn frame_clock(&self) -> Result<FixedRateClock> {
        FixedRateClock::from_fps(self.frame_rate)
    }

    pub fn memo_options(&self) -> MemoOptions {
        MemoOptions {
            capacity: self.memo_capacity,
        }
    }
}

impl ConfigBuilder for CombinatorConfig {
    fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(CombinatorError::InvalidConfig(
                "retry_attempts must be at least 1".into(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(CombinatorError::InvalidConfig(
                "frame_rate must be non-zero".into(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(CombinatorError::InvalidConfig(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        if !self.throttle_leading && !self.throttle_trailing {
            return Err(CombinatorError::InvalidConfig(
                "throttle needs a leading or trailing edge".into(),
            ));
        }
        Ok(())
    }

    fn from_env(prefix: &str) -> Result<Self> {
        let defaults = Self::default();
        let key = |name: &str| build_env_key(prefix, name);

        let memo_capacity = match get_env_parse::<usize>(&key("memo_capacity"))? {
            Some(0) => None,
            Some(capacity) => Some(capacity),
            None => defaults.memo_capacity,
        };

        let config = Self {
            debounce_delay: get_env_millis(&key("debounce_ms"), defaults.debounce_delay)?,
            throttle_delay: get_env_millis(&key("throttle_ms"), defaults.throttle_delay)?,
            throttle_leading: get_env_bool(&key("throttle_leading"))?
                .unwrap_or(defaults.throttle_leading),
            throttle_trailing: get_env_bool(&key("throttle_trailing"))?
                .unwrap_or(defaults.throttle_trailing),
            batch_delay: get_env_millis(&key("batch_ms"), defaults.batch_delay)?,
            retry_attempts: get_env_parse_or(&key("retry_attempts"), defaults.retry_attempts)?,
            retry_delay: get_env_millis(&key("retry_delay_ms"), defaults.retry_delay)?,
            frame_rate: get_env_parse_or(&key("frame_rate"), defaults.frame_rate)?,
            memo_capacity,
            concurrency_limit: get_env_parse_or(
                &key("concurrency_limit"),
                defaults.concurrency_limit,
            )?,
        };

        tracing::debug!("Loaded combinator config with prefix {:?}: {:?}", prefix, config);
        Ok(config)
    }
}
