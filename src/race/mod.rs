//! Race Engine Module
//!
//! Arbitrates between a pending asynchronous producer and a timed cache
//! lookup. The first branch to settle reports the canonical outcome; losing
//! branches run to completion for their side effects only. Producer success
//! always writes through to the cache, even after losing the race.

mod options;

pub use options::{BoxedProducer, ErrorHook, OutcomeKind, RaceOptions, RaceOutcome, ValueHook};

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cache::Cache;

type RaceResult<T> = anyhow::Result<RaceOutcome<T>>;

// == Outcome Slot ==
/// Single-assignment result slot: whichever branch reports first wins, later
/// reports are dropped.
struct OutcomeSlot<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<RaceResult<T>>>>>,
}

impl<T> Clone for OutcomeSlot<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> OutcomeSlot<T> {
    fn new(tx: oneshot::Sender<RaceResult<T>>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Reports the outcome if no branch has reported yet.
    fn report(&self, result: RaceResult<T>) {
        let sender = self.tx.lock().expect("outcome slot lock poisoned").take();
        if let Some(tx) = sender {
            // The receiver only disappears if the caller was dropped
            let _ = tx.send(result);
        }
    }

    fn reported(&self) -> bool {
        self.tx.lock().expect("outcome slot lock poisoned").is_none()
    }
}

/// Runs a hook, isolating a panic so it cannot corrupt race resolution.
fn guard_hook(name: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(hook = name, "hook panicked and was ignored");
    }
}

// == Race ==
/// Races `producer` against the cached value for `key`, returning whichever
/// becomes authoritative first.
///
/// See [`race_cache_with_outcome`] for the full resolution policy; this
/// variant discards the outcome descriptor and yields the value alone.
pub async fn race_cache<T, F>(
    cache: &Cache,
    key: &str,
    producer: F,
    options: RaceOptions<T>,
) -> anyhow::Result<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    race_cache_with_outcome(cache, key, producer, options)
        .await
        .map(|outcome| outcome.value)
}

// == Race With Outcome ==
/// Races `producer` against the cached value for `key` and reports how the
/// race resolved.
///
/// Three branches converge on one outcome:
///
/// - **Producer**: on success the value is written through to the cache
///   (fire-and-forget) and reported as [`OutcomeKind::Fulfilled`]. On failure
///   with suppression enabled, the cache is consulted, then the fallback;
///   a recovered value is reported as [`OutcomeKind::RecoveredFromError`]
///   with the original error attached. With nothing to recover, or with
///   suppression disabled, the original failure is the reported result.
/// - **Timeout**: after the wait budget, a cached value (or the
///   initial-value provider on a cold cache) is reported as
///   [`OutcomeKind::TimedOut`]. An empty cache produces nothing and the
///   caller keeps waiting on the producer.
/// - Whichever branch reports first wins; later resolutions keep their side
///   effects (write-through, hooks) but never change the reported outcome.
pub async fn race_cache_with_outcome<T, F>(
    cache: &Cache,
    key: &str,
    producer: F,
    options: RaceOptions<T>,
) -> anyhow::Result<RaceOutcome<T>>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let RaceOptions {
        wait,
        ttl_ms,
        suppress_errors,
        fallback,
        initial,
        on_fulfilled,
        on_rejected,
        on_timeout,
    } = options;

    let (tx, rx) = oneshot::channel();
    let slot = OutcomeSlot::new(tx);
    let producer_settled = Arc::new(AtomicBool::new(false));

    spawn_timeout_branch(
        cache.clone(),
        key.to_string(),
        wait,
        initial,
        on_timeout,
        slot.clone(),
        Arc::clone(&producer_settled),
    );

    spawn_producer_branch(
        cache.clone(),
        key.to_string(),
        producer,
        ttl_ms,
        suppress_errors,
        fallback,
        on_fulfilled,
        on_rejected,
        slot,
        producer_settled,
    );

    rx.await
        .unwrap_or_else(|_| Err(anyhow!("race resolved without an outcome")))
}

/// Timeout branch: wait out the budget, then let the cache win if it can.
fn spawn_timeout_branch<T>(
    cache: Cache,
    key: String,
    wait: std::time::Duration,
    initial: Option<BoxedProducer<T>>,
    on_timeout: Option<ValueHook<T>>,
    slot: OutcomeSlot<T>,
    producer_settled: Arc<AtomicBool>,
) where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(wait).await;

        let mut hit: Option<T> = cache.get(&key).await;
        if hit.is_none() {
            if let Some(initial) = initial {
                match initial.await {
                    Ok(value) => hit = Some(value),
                    Err(err) => debug!(key = %key, error = %err, "initial value provider failed"),
                }
            }
        }

        if let Some(value) = hit {
            if !producer_settled.load(Ordering::Acquire) {
                if let Some(hook) = &on_timeout {
                    guard_hook("on_timeout", || hook(&value));
                }
            }
            slot.report(Ok(RaceOutcome {
                kind: OutcomeKind::TimedOut,
                value,
                error: None,
            }));
        }
    });
}

/// Producer branch: await the caller's operation and apply the error policy.
#[allow(clippy::too_many_arguments)]
fn spawn_producer_branch<T, F>(
    cache: Cache,
    key: String,
    producer: F,
    ttl_ms: i64,
    suppress_errors: bool,
    fallback: Option<BoxedProducer<T>>,
    on_fulfilled: Option<ValueHook<T>>,
    on_rejected: Option<ErrorHook>,
    slot: OutcomeSlot<T>,
    producer_settled: Arc<AtomicBool>,
) where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        match producer.await {
            Ok(value) => {
                producer_settled.store(true, Ordering::Release);

                if let Some(hook) = &on_fulfilled {
                    guard_hook("on_fulfilled", || hook(&value));
                }

                // Write-through happens even when this branch lost the race
                let write_cache = cache.clone();
                let write_key = key.clone();
                let write_value = value.clone();
                tokio::spawn(async move {
                    if let Err(err) = write_cache.set(&write_key, &write_value, ttl_ms).await {
                        warn!(key = %write_key, error = %err, "producer value could not be cached");
                    }
                });

                slot.report(Ok(RaceOutcome {
                    kind: OutcomeKind::Fulfilled,
                    value,
                    error: None,
                }));
            }
            Err(err) => {
                producer_settled.store(true, Ordering::Release);

                if !suppress_errors {
                    // If the timeout branch already reported, this rejection
                    // is a lost race and gets dropped by the slot
                    slot.report(Err(err));
                    return;
                }

                if let Some(hook) = &on_rejected {
                    guard_hook("on_rejected", || hook(&err));
                }

                if let Some(value) = cache.get::<T>(&key).await {
                    slot.report(Ok(RaceOutcome {
                        kind: OutcomeKind::RecoveredFromError,
                        value,
                        error: Some(Arc::new(err)),
                    }));
                    return;
                }

                if !slot.reported() {
                    if let Some(fallback) = fallback {
                        match fallback.await {
                            Ok(value) => {
                                slot.report(Ok(RaceOutcome {
                                    kind: OutcomeKind::RecoveredFromError,
                                    value,
                                    error: Some(Arc::new(err)),
                                }));
                                return;
                            }
                            Err(fb_err) => {
                                // The original failure is what propagates
                                debug!(key = %key, error = %fb_err, "fallback producer failed");
                            }
                        }
                    }
                }

                slot.report(Err(err));
            }
        }
    });
}
