//! Race Options Module
//!
//! Configuration and outcome types for a race invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::DEFAULT_TTL_MS;
use crate::config::Config;

/// Boxed one-shot producer used for fallback and initial-value providers.
pub type BoxedProducer<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// Hook receiving the resolved value.
pub type ValueHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Hook receiving the producer's failure.
pub type ErrorHook = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

// == Outcome Kind ==
/// How a race resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// The producer resolved first
    Fulfilled,
    /// The cache supplied the value after the wait budget elapsed
    TimedOut,
    /// The producer failed and the cache or fallback supplied the value
    RecoveredFromError,
}

// == Race Outcome ==
/// Canonical result of a race: exactly one is reported per invocation.
#[derive(Debug, Clone)]
pub struct RaceOutcome<T> {
    /// Which branch won
    pub kind: OutcomeKind,
    /// The value handed to the caller
    pub value: T,
    /// The producer's failure, carried alongside a recovered value
    pub error: Option<Arc<anyhow::Error>>,
}

// == Race Options ==
/// Per-invocation knobs for [`race_cache`](crate::race::race_cache).
///
/// Defaults match the common case: zero wait budget (check the cache
/// immediately), one-year TTL on write-through, error suppression on.
pub struct RaceOptions<T> {
    pub(crate) wait: Duration,
    pub(crate) ttl_ms: i64,
    pub(crate) suppress_errors: bool,
    pub(crate) fallback: Option<BoxedProducer<T>>,
    pub(crate) initial: Option<BoxedProducer<T>>,
    pub(crate) on_fulfilled: Option<ValueHook<T>>,
    pub(crate) on_rejected: Option<ErrorHook>,
    pub(crate) on_timeout: Option<ValueHook<T>>,
}

impl<T> Default for RaceOptions<T> {
    fn default() -> Self {
        Self {
            wait: Duration::ZERO,
            ttl_ms: DEFAULT_TTL_MS,
            suppress_errors: true,
            fallback: None,
            initial: None,
            on_fulfilled: None,
            on_rejected: None,
            on_timeout: None,
        }
    }
}

impl<T> RaceOptions<T> {
    /// Creates options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options seeded from the process configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut options = Self::default();
        options.wait = Duration::from_millis(config.wait_ms);
        options.ttl_ms = config.default_ttl_ms;
        options
    }

    /// Wait budget before the cache is allowed to win.
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// TTL applied when the producer's value is written through.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.as_millis() as i64;
        self
    }

    /// Whether a producer failure may be recovered from the cache or
    /// fallback. When off, the failure propagates regardless of cache
    /// contents.
    pub fn suppress_errors(mut self, suppress: bool) -> Self {
        self.suppress_errors = suppress;
        self
    }

    /// Producer of last resort: consulted only when suppression is on, the
    /// producer failed and the cache had nothing. Its value is reported as
    /// recovered but never written to the cache.
    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.fallback = Some(Box::pin(fallback));
        self
    }

    /// Value to treat as cache content for this race only, so a cold cache
    /// can still serve something at the wait deadline. Not written to the
    /// cache.
    pub fn initial<F>(mut self, initial: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.initial = Some(Box::pin(initial));
        self
    }

    /// Called when the producer resolves, win or lose.
    pub fn on_fulfilled<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_fulfilled = Some(Arc::new(hook));
        self
    }

    /// Called when the producer fails and suppression is on.
    pub fn on_rejected<F>(mut self, hook: F) -> Self
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        self.on_rejected = Some(Arc::new(hook));
        self
    }

    /// Called when the cache wins at the wait deadline, unless the producer
    /// had already settled by then.
    pub fn on_timeout<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_timeout = Some(Arc::new(hook));
        self
    }
}

impl<T> std::fmt::Debug for RaceOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceOptions")
            .field("wait", &self.wait)
            .field("ttl_ms", &self.ttl_ms)
            .field("suppress_errors", &self.suppress_errors)
            .field("has_fallback", &self.fallback.is_some())
            .field("has_initial", &self.initial.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options: RaceOptions<u32> = RaceOptions::new();
        assert_eq!(options.wait, Duration::ZERO);
        assert_eq!(options.ttl_ms, DEFAULT_TTL_MS);
        assert!(options.suppress_errors);
        assert!(options.fallback.is_none());
        assert!(options.initial.is_none());
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            wait_ms: 250,
            default_ttl_ms: 10_000,
            ..Config::default()
        };

        let options: RaceOptions<u32> = RaceOptions::from_config(&config);
        assert_eq!(options.wait, Duration::from_millis(250));
        assert_eq!(options.ttl_ms, 10_000);
    }

    #[test]
    fn test_builder_chains() {
        let options: RaceOptions<u32> = RaceOptions::new()
            .wait(Duration::from_millis(50))
            .ttl(Duration::from_secs(60))
            .suppress_errors(false)
            .fallback(async { Ok(1) })
            .on_fulfilled(|_| {});

        assert_eq!(options.wait, Duration::from_millis(50));
        assert_eq!(options.ttl_ms, 60_000);
        assert!(!options.suppress_errors);
        assert!(options.fallback.is_some());
        assert!(options.on_fulfilled.is_some());
    }
}
