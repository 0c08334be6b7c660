//! # datagate
//!
//! Gateway execution core for moving bulk data between a distributed
//! platform and external resources (relational stores, remote file
//! stores) as a set of independently configured *processes*, each
//! executed through a pluggable driver pair and wrapped in a uniform
//! retry policy.
//!
//! - **Profiles**: a flat, dot-namespaced `key=value` document declares
//!   named resources and processes ([`profile`]).
//! - **Processes**: the unit of work: configure once, execute one
//!   complete source-to-drain pass ([`crate::core::traits`], [`process`]).
//! - **Retry**: a decorator adding bounded-attempt retry with a fast-fail
//!   path for cancellation ([`process::retry`]).
//! - **Column projection**: typed mapping between model properties and
//!   external tabular columns ([`projection`]).
//! - **Remote commands**: a single external command over a secure
//!   channel, with explicit stream setup and a bounded exit wait
//!   ([`session::remote`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use datagate::{Gate, GateProfile, ProcessRegistry, StaticResolver};
//! # use datagate::{DataModel, DriverFactory, ProcessScript};
//! # async fn run<M: DataModel>(factory: &dyn DriverFactory<M>, script: &ProcessScript<M>) -> datagate::Result<()> {
//! let resolver = StaticResolver::new()
//!     .with_process("basic")
//!     .with_process("retry")
//!     .with_resource("jdbc");
//! let document = std::fs::read_to_string("gateway.profile")?;
//! let profile = GateProfile::load("main", &document, &resolver)?;
//!
//! let gate: Gate<M> = Gate::new(profile, ProcessRegistry::with_builtins());
//! gate.execute("copy", factory, script, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod gate;
pub mod process;
pub mod profile;
pub mod projection;
pub mod session;

// Re-exports for convenient access
pub use crate::core::{
    ComponentResolver, DataModel, DrainDriver, DriverFactory, FieldType, FieldValue, ModelSchema,
    Process, ProcessContext, SourceDriver, StaticResolver,
};
pub use crate::error::{GateError, Phase, Result};
pub use crate::gate::{ExecutionReport, Gate};
pub use crate::process::{
    retry::RetryProcess, BasicProcess, DriverScript, ProcessRegistry, ProcessScript,
};
pub use crate::profile::{GateProfile, ProcessProfile, ProfileConfig, ResourceProfile};
pub use crate::projection::{ColumnVector, CursorReader, ParamStatement, RowCursor, StatementWriter};
pub use crate::session::remote::{Connection, SessionProfile, WaitOutcome};
pub use crate::session::SessionManager;
