//! The keyed service registry.
//!
//! Services are registered under a string tag with an explicit
//! manifest-vs-internal flag and dispensed by tag with a typed downcast.
//! Dispensing fails deterministically: a missing tag and a wrong-type
//! request are distinct errors.

use crate::error::{LoaderError, Result};
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

struct ServiceEntry {
    value: Arc<dyn Any + Send + Sync>,
    from_manifest: bool,
}

/// Keyed registry from type-tag to service object.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: DashMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `tag`. `from_manifest` marks services the
    /// project manifest contributed, as opposed to host internals.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        tag: impl Into<String>,
        value: Arc<T>,
        from_manifest: bool,
    ) {
        self.entries.insert(
            tag.into(),
            ServiceEntry {
                value,
                from_manifest,
            },
        );
    }

    /// Dispense the service registered under `tag` as a `T`.
    ///
    /// # Errors
    /// Returns error when the tag is unknown or the registered object is
    /// not a `T`.
    pub fn get<T: Send + Sync + 'static>(&self, tag: &str) -> Result<Arc<T>> {
        let entry = self
            .entries
            .get(tag)
            .ok_or_else(|| LoaderError::Registry(format!("no service registered for '{tag}'")))?;
        Arc::clone(&entry.value)
            .downcast::<T>()
            .map_err(|_| {
                LoaderError::Registry(format!(
                    "service '{tag}' is not a {}",
                    std::any::type_name::<T>()
                ))
            })
    }

    /// Whether `tag` was contributed by the manifest. `None` when the tag
    /// is unknown.
    #[must_use]
    pub fn is_from_manifest(&self, tag: &str) -> Option<bool> {
        self.entries.get(tag).map(|entry| entry.from_manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Console(&'static str);

    #[test]
    fn repeated_dispense_returns_the_same_instance() {
        let registry = ServiceRegistry::new();
        registry.register("console", Arc::new(Console("main")), false);

        let a: Arc<Console> = registry.get("console").unwrap();
        let b: Arc<Console> = registry.get("console").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn missing_tag_is_deterministic() {
        let registry = ServiceRegistry::new();
        let err = registry.get::<Console>("nothing").unwrap_err();
        assert!(err.to_string().contains("no service registered"));
    }

    #[test]
    fn wrong_type_is_deterministic() {
        let registry = ServiceRegistry::new();
        registry.register("console", Arc::new(Console("main")), false);
        let err = registry.get::<String>("console").unwrap_err();
        assert!(err.to_string().contains("is not a"));
    }

    #[test]
    fn manifest_flag_is_tracked() {
        let registry = ServiceRegistry::new();
        registry.register("from-manifest", Arc::new(Console("m")), true);
        registry.register("internal", Arc::new(Console("i")), false);
        assert_eq!(registry.is_from_manifest("from-manifest"), Some(true));
        assert_eq!(registry.is_from_manifest("internal"), Some(false));
        assert_eq!(registry.is_from_manifest("unknown"), None);
    }
}
