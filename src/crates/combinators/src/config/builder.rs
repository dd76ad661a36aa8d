//! Configuration builder trait

use crate::Result;

/// Trait for configuration structures with defaults, validation and an
/// environment layer
///
/// ```rust,ignore
/// use combinators::config::ConfigBuilder;
/// use combinators::CombinatorConfig;
///
/// // APP_DEBOUNCE_MS=150 APP_RETRY_ATTEMPTS=5
/// let config = CombinatorConfig::load("APP_")?;
/// ```
pub trait ConfigBuilder: Default + Clone {
    /// Check that every value can be used
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Load from environment variables named `{prefix}{FIELD}`
    ///
    /// Unset variables keep their default value.
    fn from_env(prefix: &str) -> Result<Self>;

    /// Default configuration, validated
    fn build() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load from the environment and validate the result
    fn load(prefix: &str) -> Result<Self> {
        let config = Self::from_env(prefix)?;
        config.validate()?;
        Ok(config)
    }
}
