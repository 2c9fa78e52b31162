//! Validate-then-persist handling for a submitted interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use autolock_store::KeyValueStore;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::defaults::AUTO_LOCK_KEY;
use crate::error::{IntervalError, IntervalResult};
use crate::model::AutoLockInterval;
use crate::validate::validate;

/// Writes user-submitted intervals to the store.
///
/// Only one submission runs at a time; a second one started before the first
/// resolves is refused with [`IntervalError::SubmissionInFlight`]. Success
/// returns once the store accepted the value. Observers pick the change up
/// through their own subscriptions.
#[derive(Clone)]
pub struct UpdateCommand {
    store: Arc<dyn KeyValueStore>,
    in_flight: Arc<AtomicBool>,
}

impl UpdateCommand {
    /// Create a command writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a submission is currently being persisted.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate `candidate` and persist it.
    ///
    /// # Errors
    ///
    /// - [`IntervalError::Validation`] when the candidate is refused; the store
    ///   is not touched.
    /// - [`IntervalError::SubmissionInFlight`] while another submission runs.
    /// - [`IntervalError::StorageWrite`] when the store rejects the write.
    pub async fn submit(&self, candidate: Option<&Value>) -> IntervalResult<AutoLockInterval> {
        let interval = validate(candidate)?;
        self.submit_interval(interval).await
    }

    /// Persist an already validated interval.
    ///
    /// # Errors
    ///
    /// Same as [`UpdateCommand::submit`], minus validation.
    #[instrument(name = "update_command.submit", skip(self), fields(minutes = interval.minutes()))]
    pub async fn submit_interval(&self, interval: AutoLockInterval) -> IntervalResult<AutoLockInterval> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        match self.store.set(AUTO_LOCK_KEY, Value::from(interval)).await {
            Ok(()) => {
                info!("auto-lock interval saved");
                Ok(interval)
            }
            Err(source) => {
                warn!(error = %source, kind = source.kind(), "failed to save auto-lock interval");
                Err(IntervalError::StorageWrite { source })
            }
        }
    }
}

/// Clears the in-flight flag on every exit path, including cancellation.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> IntervalResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| IntervalError::SubmissionInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
