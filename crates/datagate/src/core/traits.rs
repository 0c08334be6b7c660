//! Core contracts for gateway data movement.
//!
//! - [`Process`]: one named, independently configured data-movement task
//! - [`DriverFactory`]: produces the source/drain driver pair for a script
//! - [`SourceDriver`] / [`DrainDriver`]: pull and push adapters for one
//!   model type against one resource
//! - [`ComponentResolver`]: answers whether a symbolic component
//!   identifier is known, for load-time profile validation

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::schema::DataModel;
use crate::error::Result;
use crate::process::{ProcessRegistry, ProcessScript};
use crate::profile::ProcessProfile;

/// Configure-time environment handed to a [`Process`].
///
/// Carries the profile to validate against, the capability registry used
/// to construct embedded components, and the cancellation token of the
/// owning session.
pub struct ProcessContext<'a, T: DataModel> {
    pub profile: &'a ProcessProfile,
    pub registry: &'a ProcessRegistry<T>,
    pub cancellation: CancellationToken,
}

impl<'a, T: DataModel> ProcessContext<'a, T> {
    pub fn new(
        profile: &'a ProcessProfile,
        registry: &'a ProcessRegistry<T>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            profile,
            registry,
            cancellation,
        }
    }

    /// The same environment, rebased onto an embedded sub-profile.
    pub fn with_profile(&self, profile: &'a ProcessProfile) -> Self {
        Self {
            profile,
            registry: self.registry,
            cancellation: self.cancellation.clone(),
        }
    }
}

/// One named data-movement task bound to one model type.
///
/// `configure` is called exactly once, before `execute`, and must
/// validate and capture everything the process needs. In the base
/// contract `execute` runs at most once per configured instance;
/// decorators may re-invoke an inner instance's `execute` multiple
/// times, and it is the decorator's caller's responsibility that the
/// inner instance is safe to re-invoke.
#[async_trait]
pub trait Process<T: DataModel>: Send {
    /// Validate the profile and capture execution state.
    fn configure(&mut self, ctx: &ProcessContext<'_, T>) -> Result<()>;

    /// Perform one complete data-movement pass: read the source driver
    /// until exhausted, write every item to the drain driver in order,
    /// and release both drivers on every exit path.
    async fn execute(
        &mut self,
        factory: &dyn DriverFactory<T>,
        script: &ProcessScript<T>,
    ) -> Result<()>;
}

/// Produces the driver pair for a process script.
///
/// This is the only interface the core calls outward for actual data
/// movement. Ownership of the returned drivers passes to the caller,
/// which must close them on every exit path.
#[async_trait]
pub trait DriverFactory<T: DataModel>: Send + Sync {
    async fn create_source(&self, script: &ProcessScript<T>) -> Result<Box<dyn SourceDriver<T>>>;

    async fn create_drain(&self, script: &ProcessScript<T>) -> Result<Box<dyn DrainDriver<T>>>;
}

/// Pull side of a driver pair: a finite, non-restartable sequence.
#[async_trait]
pub trait SourceDriver<T>: Send {
    /// The next item, or `None` once the source is exhausted.
    async fn next(&mut self) -> Result<Option<T>>;

    /// Release the driver. Must be called on every exit path.
    async fn close(&mut self) -> Result<()>;
}

/// Push side of a driver pair.
#[async_trait]
pub trait DrainDriver<T>: Send {
    async fn put(&mut self, item: T) -> Result<()>;

    /// Release the driver. Must be called on every exit path.
    async fn close(&mut self) -> Result<()>;
}

/// Resolves symbolic component identifiers during profile loading.
///
/// Stands in for the original's class-loading context: a profile load
/// fails if any referenced component identifier is not known here.
pub trait ComponentResolver {
    fn resolves_process(&self, component: &str) -> bool;

    fn resolves_resource(&self, component: &str) -> bool;
}

/// A fixed-set resolver assembled by the host bootstrap.
#[derive(Debug, Default)]
pub struct StaticResolver {
    processes: std::collections::HashSet<String>,
    resources: std::collections::HashSet<String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, component: impl Into<String>) -> Self {
        self.processes.insert(component.into());
        self
    }

    pub fn with_resource(mut self, component: impl Into<String>) -> Self {
        self.resources.insert(component.into());
        self
    }
}

impl ComponentResolver for StaticResolver {
    fn resolves_process(&self, component: &str) -> bool {
        self.processes.contains(component)
    }

    fn resolves_resource(&self, component: &str) -> bool {
        self.resources.contains(component)
    }
}
