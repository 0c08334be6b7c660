//! Gateway entry point: execute one named process from a loaded profile.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;
use uuid::Uuid;

use crate::core::schema::DataModel;
use crate::core::traits::{DriverFactory, ProcessContext};
use crate::error::{GateError, Phase, Result};
use crate::process::{ProcessRegistry, ProcessScript};
use crate::profile::{GateProfile, ProcessProfile};
use crate::session::SessionManager;
use tokio_util::sync::CancellationToken;

/// Summary of one completed process execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub process: String,
    pub session: String,
    pub elapsed: Duration,
}

/// Executes named processes from one loaded profile.
///
/// The profile is read-only and safely shared; independent processes may
/// run concurrently, each on its own task, each under its own session.
pub struct Gate<T: DataModel> {
    profile: Arc<GateProfile>,
    registry: ProcessRegistry<T>,
    sessions: SessionManager,
}

impl<T: DataModel> Gate<T> {
    pub fn new(profile: Arc<GateProfile>, registry: ProcessRegistry<T>) -> Self {
        Self {
            profile,
            registry,
            sessions: SessionManager::new(),
        }
    }

    pub fn profile(&self) -> &GateProfile {
        &self.profile
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Run one complete pass of the named process.
    ///
    /// The session is registered for the duration of the call (a fresh id
    /// is generated when none is supplied) and released on every exit
    /// path. Failures surface the process name, the phase, and the number
    /// of attempts made; cancellation is re-raised as-is so the caller
    /// can distinguish "gave up" from "was asked to stop".
    pub async fn execute(
        &self,
        process_name: &str,
        factory: &dyn DriverFactory<T>,
        script: &ProcessScript<T>,
        session_id: Option<&str>,
    ) -> Result<ExecutionReport> {
        let process_profile = self.profile.process(process_name).ok_or_else(|| {
            GateError::config(
                format!("process.{}", process_name),
                format!("no such process in profile '{}'", self.profile.id()),
            )
        })?;

        let session = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let token = self.sessions.register(&session)?;

        let started = Instant::now();
        let result = self.run(process_profile, factory, script, token).await;
        self.sessions.complete(&session);

        result.map_err(|e| surface(process_profile, e))?;

        let elapsed = started.elapsed();
        info!(
            "Process '{}' completed in {:.2?} (session {})",
            process_name, elapsed, session
        );
        Ok(ExecutionReport {
            process: process_name.to_string(),
            session,
            elapsed,
        })
    }

    /// Forcibly terminate the named session, or every active session
    /// when no id is given. Idempotent.
    pub fn abort(&self, session_id: Option<&str>) {
        self.sessions.abort(session_id);
    }

    async fn run(
        &self,
        process_profile: &ProcessProfile,
        factory: &dyn DriverFactory<T>,
        script: &ProcessScript<T>,
        cancellation: CancellationToken,
    ) -> std::result::Result<(), PhaseError> {
        let mut process = self
            .registry
            .create(&process_profile.component)
            .map_err(|e| PhaseError(Phase::Configure, e))?;

        let ctx = ProcessContext::new(process_profile, &self.registry, cancellation);
        process
            .configure(&ctx)
            .map_err(|e| PhaseError(Phase::Configure, e))?;

        process
            .execute(factory, script)
            .await
            .map_err(|e| PhaseError(Phase::Execute, e))
    }
}

struct PhaseError(Phase, GateError);

impl From<PhaseError> for GateError {
    fn from(e: PhaseError) -> GateError {
        e.1
    }
}

fn surface(profile: &ProcessProfile, err: PhaseError) -> GateError {
    let PhaseError(phase, cause) = err;
    if cause.is_cancellation() {
        return cause;
    }
    let attempts = match (&phase, &cause) {
        (Phase::Configure, _) => 0,
        (_, GateError::RetryExhausted { attempts, .. }) => *attempts,
        _ => 1,
    };
    GateError::ProcessFailed {
        process: profile.name.clone(),
        phase,
        attempts,
        source: Box::new(cause),
    }
}
