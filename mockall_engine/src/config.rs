// vim: tw=80
use std::time::Duration;

/// Session configuration.
///
/// # Examples
///
/// ```
/// # use mockall_engine::*;
/// # use std::time::Duration;
/// let config = Config::default()
///     .with_await_timeout(Duration::from_millis(250));
/// let mock = Mock::builder().config(config).build();
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// How long [`await_invocation`] and [`await_expectations`] block before
    /// giving up.
    /// Default: 5s
    ///
    /// [`await_invocation`]: crate::Mock::await_invocation
    /// [`await_expectations`]: crate::Mock::await_expectations
    await_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            await_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Set the default timeout of the blocking await operations.
    pub fn with_await_timeout(mut self, timeout: Duration) -> Self {
        self.await_timeout = timeout;
        self
    }

    /// Returns the default timeout of the blocking await operations.
    pub fn await_timeout(&self) -> Duration {
        self.await_timeout
    }
}
