//! Process descriptors, the component registry, and the basic
//! pass-through process.

pub mod retry;

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::schema::DataModel;
use crate::core::traits::{DrainDriver, DriverFactory, Process, ProcessContext, SourceDriver};
use crate::error::{GateError, Result};
use crate::process::retry::RetryProcess;

/// Component identifier of the plain pass-through process.
pub const BASIC_COMPONENT: &str = "basic";

/// Component identifier of the retry decorator.
pub const RETRY_COMPONENT: &str = "retry";

/// One side of a process script: the resource it touches and the driver
/// configuration for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverScript {
    /// Resource name, as declared in the profile.
    pub resource: String,

    /// Driver configuration for this side.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl DriverScript {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            config: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// The unit of work handed to a process execution: a name, the model
/// type it carries, and the source/drain driver descriptors.
///
/// Created once per process invocation; read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct ProcessScript<T> {
    pub name: String,
    pub source: DriverScript,
    pub drain: DriverScript,
    #[serde(skip)]
    _model: PhantomData<fn() -> T>,
}

impl<T> ProcessScript<T> {
    pub fn new(name: impl Into<String>, source: DriverScript, drain: DriverScript) -> Self {
        Self {
            name: name.into(),
            source,
            drain,
            _model: PhantomData,
        }
    }
}

type ProviderFn<T> = Arc<dyn Fn() -> Box<dyn Process<T>> + Send + Sync>;

/// Capability registry: symbolic component identifier to a factory
/// producing a fresh, unconfigured process instance.
///
/// Replaces the original's dynamic class loading; embedded components
/// (see [`RetryProcess`]) are constructed through the same lookup at
/// configuration time.
pub struct ProcessRegistry<T: DataModel> {
    providers: HashMap<String, ProviderFn<T>>,
}

impl<T: DataModel> Default for ProcessRegistry<T> {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }
}

impl<T: DataModel> ProcessRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in components registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BASIC_COMPONENT, || Box::new(BasicProcess::new()));
        registry.register(RETRY_COMPONENT, || Box::new(RetryProcess::new()));
        registry
    }

    /// Register a component under a symbolic identifier. A later
    /// registration under the same identifier wins.
    pub fn register<F>(&mut self, component: impl Into<String>, provider: F)
    where
        F: Fn() -> Box<dyn Process<T>> + Send + Sync + 'static,
    {
        self.providers.insert(component.into(), Arc::new(provider));
    }

    pub fn contains(&self, component: &str) -> bool {
        self.providers.contains_key(component)
    }

    /// Construct a fresh, unconfigured instance of a component.
    pub fn create(&self, component: &str) -> Result<Box<dyn Process<T>>> {
        let provider = self.providers.get(component).ok_or_else(|| {
            GateError::config(
                component,
                format!(
                    "unknown process component (registered: {})",
                    self.registered_ids().join(", ")
                ),
            )
        })?;
        Ok(provider())
    }

    fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// The plain data-movement pass: pull every item from the source driver
/// and push it to the drain driver, preserving order, one item in flight
/// at a time.
pub struct BasicProcess<T> {
    process: String,
    cancellation: CancellationToken,
    _model: PhantomData<fn() -> T>,
}

impl<T> BasicProcess<T> {
    pub fn new() -> Self {
        Self {
            process: String::new(),
            cancellation: CancellationToken::new(),
            _model: PhantomData,
        }
    }
}

impl<T> Default for BasicProcess<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: DataModel> Process<T> for BasicProcess<T> {
    fn configure(&mut self, ctx: &ProcessContext<'_, T>) -> Result<()> {
        self.process = ctx.profile.name.clone();
        self.cancellation = ctx.cancellation.clone();
        debug!("Configured basic process '{}'", self.process);
        Ok(())
    }

    async fn execute(
        &mut self,
        factory: &dyn DriverFactory<T>,
        script: &ProcessScript<T>,
    ) -> Result<()> {
        let mut source = factory.create_source(script).await?;
        let mut drain = match factory.create_drain(script).await {
            Ok(drain) => drain,
            Err(e) => {
                // source ownership already passed to us; release it
                let _ = source.close().await;
                return Err(e);
            }
        };

        let moved = copy_items(
            source.as_mut(),
            drain.as_mut(),
            &self.cancellation,
        )
        .await;

        // Both drivers are released on every exit path; the first error
        // wins, close failures surface only on an otherwise clean pass.
        let source_closed = source.close().await;
        let drain_closed = drain.close().await;

        let count = moved?;
        source_closed?;
        drain_closed?;

        info!(
            "Process '{}' moved {} item(s) from '{}' to '{}'",
            script.name, count, script.source.resource, script.drain.resource
        );
        Ok(())
    }
}

async fn copy_items<T: DataModel>(
    source: &mut dyn SourceDriver<T>,
    drain: &mut dyn DrainDriver<T>,
    cancellation: &CancellationToken,
) -> Result<u64> {
    let mut count = 0u64;
    loop {
        if cancellation.is_cancelled() {
            return Err(GateError::Cancelled);
        }
        match source.next().await? {
            None => return Ok(count),
            Some(item) => {
                drain.put(item).await?;
                count += 1;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio_util::sync::CancellationToken;

    use super::testing::{MemoryFactory, Record};
    use super::*;
    use crate::core::traits::StaticResolver;
    use crate::profile::GateProfile;

    fn configured_basic(
        profile_doc: &str,
        cancellation: CancellationToken,
    ) -> Box<dyn Process<Record>> {
        let registry = ProcessRegistry::<Record>::with_builtins();
        let resolver = StaticResolver::new()
            .with_process(BASIC_COMPONENT)
            .with_process(RETRY_COMPONENT)
            .with_resource("mem");
        let profile = GateProfile::load("test", profile_doc, &resolver).unwrap();
        let process_profile = profile.process("copy").unwrap().clone();

        let mut process = registry.create(&process_profile.component).unwrap();
        let ctx = ProcessContext::new(&process_profile, &registry, cancellation);
        process.configure(&ctx).unwrap();
        process
    }

    fn script() -> ProcessScript<Record> {
        ProcessScript::new("copy", DriverScript::new("mem"), DriverScript::new("mem"))
    }

    #[tokio::test]
    async fn test_basic_process_moves_items_in_order() {
        let mut process = configured_basic("process.copy = basic", CancellationToken::new());
        let factory = MemoryFactory::new(vec![
            Record::new(1, "a"),
            Record::new(2, "b"),
            Record::new(3, "c"),
        ]);

        process.execute(&factory, &script()).await.unwrap();

        let sink = factory.sink.lock().unwrap();
        assert_eq!(sink.len(), 3);
        assert_eq!(sink[0].id, 1);
        assert_eq!(sink[2].id, 3);
        assert_eq!(factory.source_closed.load(Ordering::SeqCst), 1);
        assert_eq!(factory.drain_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_basic_process_closes_drivers_on_failure() {
        let mut process = configured_basic("process.copy = basic", CancellationToken::new());
        let mut factory = MemoryFactory::new(vec![Record::new(1, "a"), Record::new(2, "b")]);
        factory.drain_fail_after = Some(1);

        let err = process.execute(&factory, &script()).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(factory.source_closed.load(Ordering::SeqCst), 1);
        assert_eq!(factory.drain_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_basic_process_cancellation() {
        let token = CancellationToken::new();
        let mut process = configured_basic("process.copy = basic", token.clone());
        let factory = MemoryFactory::new(vec![Record::new(1, "a")]);

        token.cancel();
        let err = process.execute(&factory, &script()).await.unwrap_err();
        assert!(err.is_cancellation());
        // drivers are still released
        assert_eq!(factory.source_closed.load(Ordering::SeqCst), 1);
        assert_eq!(factory.drain_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_unknown_component() {
        let registry = ProcessRegistry::<Record>::with_builtins();
        assert!(registry.contains(BASIC_COMPONENT));
        assert!(registry.contains(RETRY_COMPONENT));

        let err = registry.create("exotic").err().unwrap();
        assert!(err.to_string().contains("exotic"));
        assert!(err.to_string().contains("basic"));
    }

    #[test]
    fn test_process_script_round_trips_through_json() {
        let script = ProcessScript::<Record>::new(
            "copy",
            DriverScript::new("db").with("table", "shipments"),
            DriverScript::new("files"),
        );
        let json = serde_json::to_string(&script).unwrap();
        let back: ProcessScript<Record> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "copy");
        assert_eq!(back.source.resource, "db");
        assert_eq!(back.source.config.get("table").map(String::as_str), Some("shipments"));
    }
}
