use std::time::Duration;

use snafu::Snafu;

/// Error returned by [`ConfigBuilder::build`] when the supplied parameters violate one of the
/// constraints documented on [`Config`].
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum BuildError {
    #[snafu(display("parameter '{}' was invalid: {}", param_name, reason))]
    InvalidParameter {
        param_name: &'static str,
        reason: String,
    },
}

/// Configuration for an [`crate::EcProtect`] instance.
///
/// All fields are fixed at construction; there is no facility for reconfiguring a running
/// instance.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Bytes per block.
    pub(crate) block_size: usize,

    /// Minimum time between the completion of one write and the start of the next write to the
    /// same block.
    pub(crate) min_write_delay: Duration,

    /// How long an entry remains `Written` before it becomes eligible for expiry.
    pub(crate) cache_time: Duration,

    /// Maximum number of entries tracked at once.
    pub(crate) cache_size: usize,
}

impl Config {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn min_write_delay(&self) -> Duration {
        self.min_write_delay
    }

    pub fn cache_time(&self) -> Duration {
        self.cache_time
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }
}

/// Builder for [`Config`].
#[derive(Clone, Copy, Debug)]
pub struct ConfigBuilder {
    block_size: Option<usize>,
    min_write_delay: Option<Duration>,
    cache_time: Option<Duration>,
    cache_size: Option<usize>,
}

impl ConfigBuilder {
    /// Creates a new builder with no parameters set.
    pub fn new() -> Self {
        Self {
            block_size: None,
            min_write_delay: None,
            cache_time: None,
            cache_size: None,
        }
    }

    /// Sets the number of bytes per block.
    ///
    /// Must be greater than zero. There is no default; this must be set.
    pub fn block_size(mut self, amount: usize) -> Self {
        self.block_size = Some(amount);
        self
    }

    /// Sets the minimum time between the completion of one write and the start of the next write
    /// to the same block.
    ///
    /// Defaults to zero.
    pub fn min_write_delay(mut self, delay: Duration) -> Self {
        self.min_write_delay = Some(delay);
        self
    }

    /// Sets how long an entry remains `Written` before it becomes eligible for expiry.
    ///
    /// Must be greater than or equal to `min_write_delay`. Defaults to `min_write_delay`.
    pub fn cache_time(mut self, duration: Duration) -> Self {
        self.cache_time = Some(duration);
        self
    }

    /// Sets the maximum number of entries tracked at once.
    ///
    /// Must be at least 1. There is no default; this must be set.
    pub fn cache_size(mut self, amount: usize) -> Self {
        self.cache_size = Some(amount);
        self
    }

    /// Consumes this builder and constructs a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidParameter`] if any constraint documented on the individual
    /// setters is violated.
    pub fn build(self) -> Result<Config, BuildError> {
        let block_size = self.block_size.ok_or_else(|| BuildError::InvalidParameter {
            param_name: "block_size",
            reason: "must be set".to_string(),
        })?;
        if block_size == 0 {
            return Err(BuildError::InvalidParameter {
                param_name: "block_size",
                reason: "cannot be zero".to_string(),
            });
        }

        let cache_size = self.cache_size.ok_or_else(|| BuildError::InvalidParameter {
            param_name: "cache_size",
            reason: "must be set".to_string(),
        })?;
        if cache_size == 0 {
            return Err(BuildError::InvalidParameter {
                param_name: "cache_size",
                reason: "must be at least 1".to_string(),
            });
        }

        let min_write_delay = self.min_write_delay.unwrap_or(Duration::ZERO);
        let cache_time = self.cache_time.unwrap_or(min_write_delay);

        if cache_time < min_write_delay {
            return Err(BuildError::InvalidParameter {
                param_name: "cache_time",
                reason: format!(
                    "must be greater than or equal to min_write_delay ({min_write_delay:?})"
                ),
            });
        }

        Ok(Config {
            block_size,
            min_write_delay,
            cache_time,
            cache_size,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
