//! Profile loading and validation.
//!
//! A profile document is a flat text file of `key=value` lines with
//! dot-separated namespacing:
//!
//! ```text
//! resource.<name>          = <component identifier>
//! resource.<name>.<key>    = <value>
//! process.<name>           = <component identifier>
//! process.<name>.<key>     = <value>
//! ```
//!
//! The flat-key model is deliberate; nested component configuration uses
//! key prefixes (`process.<name>.component.<key>`) rather than a
//! hierarchical document format, and downstream tooling assumes it.

use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::core::traits::ComponentResolver;
use crate::error::{GateError, Result};

/// Key prefix under which a process embeds its inner component's
/// configuration.
pub const COMPONENT_PREFIX: &str = "component.";

/// Configuration key naming a process's embedded component.
pub const COMPONENT_KEY: &str = "component";

const NS_RESOURCE: &str = "resource";
const NS_PROCESS: &str = "process";

/// The flat configuration of one profile section.
///
/// Keys are stored without their namespace; `prefix` is the dotted path
/// ("process.copy.") prepended when reporting errors, so every failure
/// names the full offending key as it appears in the document.
#[derive(Debug, Clone, Default)]
pub struct ProfileConfig {
    prefix: String,
    entries: BTreeMap<String, String>,
}

impl ProfileConfig {
    pub fn new(prefix: impl Into<String>, entries: BTreeMap<String, String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries,
        }
    }

    /// The full dotted document key for a config key in this section.
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// A mandatory key; missing is a configuration error naming the key.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| GateError::config(self.full_key(key), "mandatory key is missing"))
    }

    /// An optional key parsed into `T`; present-but-unparsable is an
    /// error naming the key.
    pub fn get_parse<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                GateError::config(
                    self.full_key(key),
                    format!("value '{}' is not valid", raw),
                )
            }),
        }
    }

    /// A mandatory key parsed into `T`.
    pub fn require_parse<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        self.get_parse(key)?
            .ok_or_else(|| GateError::config(self.full_key(key), "mandatory key is missing"))
    }

    /// Every key starting with `prefix`, with the prefix stripped and
    /// values preserved verbatim (including empty strings). An empty
    /// result is not an error.
    pub fn sub_config(&self, prefix: &str) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .map(|stripped| (stripped.to_string(), v.clone()))
            })
            .collect()
    }

    /// All entries of this section.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

/// A named resource: an external system accessed through a driver.
#[derive(Debug, Clone)]
pub struct ResourceProfile {
    pub name: String,
    pub component: String,
    pub config: ProfileConfig,
}

/// A named process: one data-movement task and its configuration.
#[derive(Debug, Clone)]
pub struct ProcessProfile {
    pub name: String,
    pub component: String,
    pub config: ProfileConfig,
}

impl ProcessProfile {
    /// The embedded component profile: same process name, the given
    /// component identifier, and the `component.`-prefixed sub-mapping
    /// as its configuration.
    pub fn sub_profile(&self, component: impl Into<String>) -> ProcessProfile {
        ProcessProfile {
            name: self.name.clone(),
            component: component.into(),
            config: ProfileConfig::new(
                format!("{}{}", self.config.prefix, COMPONENT_PREFIX),
                self.config.sub_config(COMPONENT_PREFIX),
            ),
        }
    }
}

/// A loaded, validated profile document. Immutable; safely shared by
/// concurrently executing processes.
#[derive(Debug)]
pub struct GateProfile {
    id: String,
    fingerprint: String,
    resources: BTreeMap<String, ResourceProfile>,
    processes: BTreeMap<String, ProcessProfile>,
}

impl GateProfile {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// SHA-256 digest of the raw document, for logging and run identity.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceProfile> {
        self.resources.get(name)
    }

    pub fn process(&self, name: &str) -> Option<&ProcessProfile> {
        self.processes.get(name)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceProfile> {
        self.resources.values()
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessProfile> {
        self.processes.values()
    }

    /// Load and validate a profile document.
    ///
    /// Fails with a [`GateError::Configuration`] naming the offending key
    /// if the document is malformed, a section lacks its component
    /// declaration, or any referenced component identifier (including a
    /// process's embedded `component`) cannot be resolved.
    pub fn load(
        id: impl Into<String>,
        document: &str,
        resolver: &dyn ComponentResolver,
    ) -> Result<Arc<GateProfile>> {
        let id = id.into();
        let entries = parse_document(document)?;

        let mut resources: BTreeMap<String, SectionParts> = BTreeMap::new();
        let mut processes: BTreeMap<String, SectionParts> = BTreeMap::new();

        for (key, value) in entries {
            let mut segments = key.splitn(3, '.');
            let namespace = segments.next().unwrap_or("");
            let name = segments.next().unwrap_or("");
            let rest = segments.next();

            if name.is_empty() {
                return Err(GateError::config(key.as_str(), "key is missing a section name"));
            }

            let sections = match namespace {
                NS_RESOURCE => &mut resources,
                NS_PROCESS => &mut processes,
                _ => {
                    return Err(GateError::config(
                        key.as_str(),
                        format!(
                            "unknown namespace '{}' (expected '{}' or '{}')",
                            namespace, NS_RESOURCE, NS_PROCESS
                        ),
                    ))
                }
            };

            let section = sections.entry(name.to_string()).or_default();
            match rest {
                None => section.component = Some(value),
                Some(config_key) => {
                    if config_key.is_empty() {
                        return Err(GateError::config(key.as_str(), "empty configuration key"));
                    }
                    section.entries.insert(config_key.to_string(), value);
                }
            }
        }

        let resources = build_sections(NS_RESOURCE, resources, |component, key| {
            if resolver.resolves_resource(component) {
                Ok(())
            } else {
                Err(GateError::config(
                    key,
                    format!("unresolvable resource component '{}'", component),
                ))
            }
        })?
        .into_iter()
        .map(|(name, component, config)| {
            (
                name.clone(),
                ResourceProfile {
                    name,
                    component,
                    config,
                },
            )
        })
        .collect();

        let processes: BTreeMap<String, ProcessProfile> =
            build_sections(NS_PROCESS, processes, |component, key| {
                if resolver.resolves_process(component) {
                    Ok(())
                } else {
                    Err(GateError::config(
                        key,
                        format!("unresolvable process component '{}'", component),
                    ))
                }
            })?
            .into_iter()
            .map(|(name, component, config)| {
                (
                    name.clone(),
                    ProcessProfile {
                        name,
                        component,
                        config,
                    },
                )
            })
            .collect();

        // Embedded components are resolved at configure time too, but an
        // unresolvable identifier must fail the whole batch up front.
        for process in processes.values() {
            if let Some(embedded) = process.config.get(COMPONENT_KEY) {
                if !resolver.resolves_process(embedded) {
                    return Err(GateError::config(
                        process.config.full_key(COMPONENT_KEY),
                        format!("unresolvable embedded component '{}'", embedded),
                    ));
                }
            }
        }

        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(document.as_bytes());
            format!("{:x}", hasher.finalize())
        };

        let profile = GateProfile {
            id,
            fingerprint,
            resources,
            processes,
        };

        info!(
            "Loaded profile '{}': {} resource(s), {} process(es), fingerprint {}",
            profile.id,
            profile.resources.len(),
            profile.processes.len(),
            &profile.fingerprint[..12]
        );

        Ok(Arc::new(profile))
    }
}

#[derive(Default)]
struct SectionParts {
    component: Option<String>,
    entries: BTreeMap<String, String>,
}

fn build_sections(
    namespace: &str,
    sections: BTreeMap<String, SectionParts>,
    check: impl Fn(&str, &str) -> Result<()>,
) -> Result<Vec<(String, String, ProfileConfig)>> {
    let mut out = Vec::with_capacity(sections.len());
    for (name, parts) in sections {
        let declaration_key = format!("{}.{}", namespace, name);
        let component = parts.component.ok_or_else(|| {
            GateError::config(
                declaration_key.as_str(),
                "section has configuration keys but no component declaration",
            )
        })?;
        if component.is_empty() {
            return Err(GateError::config(declaration_key.as_str(), "empty component identifier"));
        }
        check(&component, &declaration_key)?;

        let config = ProfileConfig::new(format!("{}.", declaration_key), parts.entries);
        out.push((name, component, config));
    }
    Ok(out)
}

/// Parse the flat document into `(key, value)` pairs.
///
/// Blank lines and `#` comments are skipped; a line without `=` or a
/// duplicate key fails the whole load.
fn parse_document(document: &str) -> Result<Vec<(String, String)>> {
    let mut seen = BTreeMap::new();
    let mut entries = Vec::new();

    for (lineno, raw) in document.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(GateError::config(
                format!("line {}", lineno + 1),
                format!("malformed line (expected key=value): '{}'", line),
            ));
        };

        let key = key.trim().to_string();
        let value = value.trim().to_string();
        if key.is_empty() {
            return Err(GateError::config(
                format!("line {}", lineno + 1),
                "empty key",
            ));
        }
        if seen.insert(key.clone(), ()).is_some() {
            return Err(GateError::config(key.as_str(), "duplicate key"));
        }
        entries.push((key, value));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::StaticResolver;

    fn resolver() -> StaticResolver {
        StaticResolver::new()
            .with_process("basic")
            .with_process("retry")
            .with_resource("jdbc")
            .with_resource("remote-fs")
    }

    const DOC: &str = r#"
# gateway profile
resource.db = jdbc
resource.db.host = db.example.com
resource.db.port = 5432

resource.files = remote-fs
resource.files.host = edge.example.com

process.copy = basic
process.copy.batchSize = 100

process.sturdy = retry
process.sturdy.retryCount = 3
process.sturdy.component = basic
process.sturdy.component.batchSize = 50
process.sturdy.component.note =
"#;

    #[test]
    fn test_load_profile() {
        let profile = GateProfile::load("main", DOC, &resolver()).unwrap();

        assert_eq!(profile.id(), "main");
        assert_eq!(profile.resources().count(), 2);
        assert_eq!(profile.processes().count(), 2);
        assert_eq!(profile.fingerprint().len(), 64);

        let db = profile.resource("db").unwrap();
        assert_eq!(db.component, "jdbc");
        assert_eq!(db.config.get("host"), Some("db.example.com"));

        let copy = profile.process("copy").unwrap();
        assert_eq!(copy.component, "basic");
        assert_eq!(copy.config.require_parse::<u32>("batchSize").unwrap(), 100);
    }

    #[test]
    fn test_sub_config_strips_prefix_and_keeps_values_verbatim() {
        let profile = GateProfile::load("main", DOC, &resolver()).unwrap();
        let sturdy = profile.process("sturdy").unwrap();

        let sub = sturdy.config.sub_config(COMPONENT_PREFIX);
        assert_eq!(sub.get("batchSize").map(String::as_str), Some("50"));
        // empty values survive extraction
        assert_eq!(sub.get("note").map(String::as_str), Some(""));
        // the bare `component` key itself is not part of the sub-mapping
        assert!(!sub.contains_key(""));
    }

    #[test]
    fn test_sub_config_empty_match_is_not_an_error() {
        let profile = GateProfile::load("main", DOC, &resolver()).unwrap();
        let copy = profile.process("copy").unwrap();
        assert!(copy.config.sub_config("nothing.").is_empty());
    }

    #[test]
    fn test_sub_profile() {
        let profile = GateProfile::load("main", DOC, &resolver()).unwrap();
        let sturdy = profile.process("sturdy").unwrap();

        let inner = sturdy.sub_profile("basic");
        assert_eq!(inner.name, "sturdy");
        assert_eq!(inner.component, "basic");
        assert_eq!(inner.config.get("batchSize"), Some("50"));
        // errors inside the sub-profile name the full dotted path
        let err = inner.config.require("missing").unwrap_err();
        assert!(err
            .to_string()
            .contains("process.sturdy.component.missing"));
    }

    #[test]
    fn test_malformed_line_fails() {
        let err = GateProfile::load("main", "resource.db jdbc", &resolver()).unwrap_err();
        assert!(matches!(err, GateError::Configuration { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_duplicate_key_fails() {
        let doc = "process.copy = basic\nprocess.copy = basic";
        let err = GateProfile::load("main", doc, &resolver()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_unknown_namespace_fails() {
        let err = GateProfile::load("main", "job.copy = basic", &resolver()).unwrap_err();
        assert!(err.to_string().contains("job.copy"));
    }

    #[test]
    fn test_section_without_component_fails() {
        let err =
            GateProfile::load("main", "process.copy.batchSize = 10", &resolver()).unwrap_err();
        assert!(err.to_string().contains("process.copy"));
        assert!(err.to_string().contains("no component declaration"));
    }

    #[test]
    fn test_unresolvable_component_fails_batch() {
        let doc = "process.copy = exotic";
        let err = GateProfile::load("main", doc, &resolver()).unwrap_err();
        assert!(err.to_string().contains("exotic"));
    }

    #[test]
    fn test_unresolvable_embedded_component_fails_batch() {
        let doc = "process.sturdy = retry\nprocess.sturdy.component = exotic";
        let err = GateProfile::load("main", doc, &resolver()).unwrap_err();
        assert!(err.to_string().contains("process.sturdy.component"));
    }

    #[test]
    fn test_unparsable_value_names_key() {
        let profile = GateProfile::load("main", DOC, &resolver()).unwrap();
        let db = profile.resource("db").unwrap();
        let err = db.config.require_parse::<u16>("host").unwrap_err();
        assert!(err.to_string().contains("resource.db.host"));
    }
}
