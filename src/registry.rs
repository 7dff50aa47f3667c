//! Node registry: an explicit, ordered table of node classes.
//!
//! The host creates a registry at startup and hands it to the graph builder.
//! There is no process-wide table and no static initialization order; the
//! iteration order is the registration order.

use crate::invariant_ppt::{assert_invariant, REGISTRY_ORDER_STABLE};
use crate::node::{Node, NodeClass, NodeInfo};
use crate::nodes::{Compare, EveryEdgeTimer, OnePoleFir, Phasor, Pow, Sqrt, Timer};
use crate::settings::OperatorSettings;
use std::fmt;

/// Function that builds a fresh node instance.
pub type NodeConstructor = fn(&OperatorSettings) -> Box<dyn Node>;

/// Registry key: class name plus major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub name: &'static str,
    pub major: u32,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.major)
    }
}

/// One registered class.
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    info: &'static NodeInfo,
    construct: NodeConstructor,
}

impl RegistryEntry {
    pub fn info(&self) -> &'static NodeInfo {
        self.info
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            name: self.info.name,
            major: self.info.major_version,
        }
    }

    /// Build an instance for `settings`.
    pub fn create(&self, settings: &OperatorSettings) -> Box<dyn Node> {
        (self.construct)(settings)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistryEntry({})", self.key())
    }
}

fn construct<N: NodeClass>(settings: &OperatorSettings) -> Box<dyn Node> {
    Box::new(N::create(settings))
}

fn entry<N: NodeClass>() -> RegistryEntry {
    RegistryEntry {
        info: N::info(),
        construct: construct::<N>,
    }
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown node class: {0}")]
    UnknownClass(String),
    #[error("node class {name} has no major version {major}")]
    UnknownVersion { name: String, major: u32 },
    #[error("node class {0} is already registered")]
    Duplicate(NodeKey),
}

/// Ordered table of node classes.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Every built-in class, in a fixed order.
    pub fn builtin() -> Self {
        let entries = vec![
            entry::<Phasor>(),
            entry::<Timer>(),
            entry::<EveryEdgeTimer>(),
            entry::<Compare>(),
            entry::<Pow>(),
            entry::<Sqrt>(),
            entry::<OnePoleFir>(),
        ];
        tracing::debug!(count = entries.len(), "registered built-in node classes");
        Self { entries }
    }

    /// Add `N` after every class registered so far.
    pub fn register<N: NodeClass>(&mut self) -> Result<(), RegistryError> {
        let candidate = entry::<N>();
        let key = candidate.key();
        if self.entries.iter().any(|e| e.key() == key) {
            tracing::warn!(%key, "rejected duplicate node class");
            return Err(RegistryError::Duplicate(key));
        }
        let before = self.entries.len();
        self.entries.push(candidate);
        assert_invariant(
            REGISTRY_ORDER_STABLE,
            self.entries.len() == before + 1 && self.entries[before].key() == key,
            "New class appended after existing ones",
            Some("Registry::register"),
        );
        tracing::debug!(%key, "registered node class");
        Ok(())
    }

    /// The class `name` at major version `major`.
    pub fn get(&self, name: &str, major: u32) -> Result<&RegistryEntry, RegistryError> {
        let mut known = false;
        for e in &self.entries {
            if e.info.name == name {
                if e.info.major_version == major {
                    return Ok(e);
                }
                known = true;
            }
        }
        if known {
            Err(RegistryError::UnknownVersion {
                name: name.to_string(),
                major,
            })
        } else {
            Err(RegistryError::UnknownClass(name.to_string()))
        }
    }

    /// The lowest registered major version of `name`.
    ///
    /// Newer majors change behavior and must be asked for explicitly.
    pub fn get_default(&self, name: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .iter()
            .filter(|e| e.info.name == name)
            .min_by_key(|e| e.info.major_version)
            .ok_or_else(|| RegistryError::UnknownClass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.info.name == name)
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_order_is_fixed() {
        let keys: Vec<String> = Registry::builtin().iter().map(|e| e.key().to_string()).collect();
        assert_eq!(
            keys,
            [
                "Phasor@1",
                "Timer@1",
                "Timer@2",
                "Compare@1",
                "Pow@1",
                "Sqrt@1",
                "OnePoleFir@1"
            ]
        );
    }

    #[test]
    fn default_version_is_lowest_major() {
        let registry = Registry::builtin();
        let entry = registry.get_default("Timer").unwrap();
        assert_eq!(entry.info().major_version, 1);
        assert_eq!(registry.get("Timer", 2).unwrap().info().display_name, "Timer (Every Edge)");
    }

    #[test]
    fn lookup_errors() {
        let registry = Registry::builtin();
        assert_eq!(
            registry.get("Reverb", 1).unwrap_err(),
            RegistryError::UnknownClass("Reverb".to_string())
        );
        assert_eq!(
            registry.get("Phasor", 3).unwrap_err(),
            RegistryError::UnknownVersion {
                name: "Phasor".to_string(),
                major: 3
            }
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register::<Phasor>().unwrap();
        registry.register::<Timer>().unwrap();
        registry.register::<EveryEdgeTimer>().unwrap();
        assert_eq!(
            registry.register::<Timer>(),
            Err(RegistryError::Duplicate(NodeKey {
                name: "Timer",
                major: 1
            }))
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn entries_create_fresh_instances() {
        let registry = Registry::builtin();
        let settings = OperatorSettings::default();
        let node = registry.get_default("Phasor").unwrap().create(&settings);
        assert_eq!(node.describe().name, "Phasor");
    }
}
