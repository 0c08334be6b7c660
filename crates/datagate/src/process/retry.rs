//! Retry decorator over an inner process.
//!
//! Wraps exactly one embedded component and re-runs it on ordinary
//! recoverable failures: one initial attempt plus `retryCount` additional
//! attempts, strictly sequential on the same task. Cancellation is never
//! retried; neither are configuration or column-mapping failures. Each
//! attempt is a fully independent execution of the inner contract with no
//! partial-progress carryover.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::schema::DataModel;
use crate::core::traits::{DriverFactory, Process, ProcessContext};
use crate::error::{GateError, Result};
use crate::process::ProcessScript;
use crate::profile::COMPONENT_KEY;

/// Mandatory key: additional attempts permitted after the first.
const RETRY_COUNT_KEY: &str = "retryCount";

/// Optional key: milliseconds to sleep between attempts.
const RETRY_INTERVAL_KEY: &str = "retryInterval";

/// Process decorator adding bounded-attempt retry around an embedded
/// component.
pub struct RetryProcess<T> {
    process: String,
    retry_count: u32,
    retry_interval: Duration,
    inner: Option<Box<dyn Process<T>>>,
    _model: PhantomData<fn() -> T>,
}

impl<T> RetryProcess<T> {
    pub fn new() -> Self {
        Self {
            process: String::new(),
            retry_count: 0,
            retry_interval: Duration::ZERO,
            inner: None,
            _model: PhantomData,
        }
    }
}

impl<T> Default for RetryProcess<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: DataModel> Process<T> for RetryProcess<T> {
    fn configure(&mut self, ctx: &ProcessContext<'_, T>) -> Result<()> {
        let config = &ctx.profile.config;

        let retry_count: u32 = config.require_parse(RETRY_COUNT_KEY)?;
        if retry_count < 1 {
            return Err(GateError::config(
                config.full_key(RETRY_COUNT_KEY),
                format!("must be an integer >= 1, got {}", retry_count),
            ));
        }

        let interval_ms: u64 = config.get_parse(RETRY_INTERVAL_KEY)?.unwrap_or(0);

        let component = config.require(COMPONENT_KEY)?.to_string();
        let mut inner = ctx.registry.create(&component)?;

        let sub_profile = ctx.profile.sub_profile(component);
        inner.configure(&ctx.with_profile(&sub_profile))?;

        self.process = ctx.profile.name.clone();
        self.retry_count = retry_count;
        self.retry_interval = Duration::from_millis(interval_ms);
        self.inner = Some(inner);

        debug!(
            "Configured retry process '{}': {} retry(ies) after the first attempt",
            self.process, self.retry_count
        );
        Ok(())
    }

    async fn execute(
        &mut self,
        factory: &dyn DriverFactory<T>,
        script: &ProcessScript<T>,
    ) -> Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| GateError::Execution("retry process was not configured".into()))?;

        // One initial attempt plus retry_count additional attempts.
        let total_attempts = self.retry_count + 1;

        for attempt in 1..=total_attempts {
            match inner.execute(factory, script).await {
                Ok(()) => return Ok(()),
                Err(cause) if cause.is_cancellation() => {
                    // Interrupted, not failed: re-raise immediately so the
                    // caller can distinguish "gave up" from "was asked to
                    // stop".
                    return Err(cause);
                }
                Err(cause) if cause.is_recoverable() && attempt < total_attempts => {
                    warn!(
                        "Process '{}' attempt {}/{} failed, retrying: {}",
                        self.process, attempt, total_attempts, cause
                    );
                    if !self.retry_interval.is_zero() {
                        tokio::time::sleep(self.retry_interval).await;
                    }
                }
                Err(cause) if cause.is_recoverable() => {
                    return Err(GateError::RetryExhausted {
                        attempts: total_attempts,
                        source: Box::new(cause),
                    });
                }
                Err(cause) => return Err(cause),
            }
        }

        unreachable!("retry loop always returns")
    }
}
