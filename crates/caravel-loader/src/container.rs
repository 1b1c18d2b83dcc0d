//! The loader container.

use crate::compiler::LoadedModule;
use crate::error::Result;
use crate::registry::ServiceRegistry;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// A loader the container can dispatch to.
pub trait ModuleLoader: Send + Sync {
    /// Load `assembly_name`, or report "no match" with `None` so the
    /// container can try the next loader.
    fn load<'a>(
        &'a self,
        assembly_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Arc<LoadedModule>>>>;
}

impl ModuleLoader for crate::compiler::ProjectCompiler {
    fn load<'a>(
        &'a self,
        assembly_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<Arc<LoadedModule>>>> {
        Self::load(self, assembly_name)
    }
}

/// Registers loaders by key and dispatches load requests to them in
/// registration order. Also owns the container's service registry.
#[derive(Default)]
pub struct LoaderContainer {
    loaders: Vec<(String, Arc<dyn ModuleLoader>)>,
    services: ServiceRegistry,
}

impl LoaderContainer {
    /// An empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader under `key`.
    pub fn register_loader(&mut self, key: impl Into<String>, loader: Arc<dyn ModuleLoader>) {
        self.loaders.push((key.into(), loader));
    }

    /// The loader registered under `key`.
    #[must_use]
    pub fn loader(&self, key: &str) -> Option<Arc<dyn ModuleLoader>> {
        self.loaders
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, loader)| Arc::clone(loader))
    }

    /// The container's service registry.
    #[must_use]
    pub const fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Load `assembly_name` through the registered loaders, first match
    /// wins.
    ///
    /// # Errors
    /// Propagates the first loader failure; "no match" is `Ok(None)`.
    pub async fn load(&self, assembly_name: &str) -> Result<Option<Arc<LoadedModule>>> {
        for (key, loader) in &self.loaders {
            if let Some(module) = loader.load(assembly_name).await? {
                debug!(assembly = assembly_name, loader = %key, "module dispatched");
                return Ok(Some(module));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::Version;
    use futures::FutureExt;

    struct FixedLoader {
        name: &'static str,
    }

    impl ModuleLoader for FixedLoader {
        fn load<'a>(
            &'a self,
            assembly_name: &'a str,
        ) -> BoxFuture<'a, Result<Option<Arc<LoadedModule>>>> {
            async move {
                if assembly_name == self.name {
                    Ok(Some(Arc::new(LoadedModule {
                        name: self.name.to_string(),
                        version: Version::parse("1.0").unwrap(),
                        image: Vec::new(),
                        image_path: None,
                        symbols_path: None,
                        exports: Vec::new(),
                    })))
                } else {
                    Ok(None)
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn dispatches_in_registration_order() {
        let mut container = LoaderContainer::new();
        container.register_loader("first", Arc::new(FixedLoader { name: "A" }));
        container.register_loader("second", Arc::new(FixedLoader { name: "B" }));

        assert_eq!(container.load("A").await.unwrap().unwrap().name, "A");
        assert_eq!(container.load("B").await.unwrap().unwrap().name, "B");
        assert!(container.load("C").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn loaders_are_dispensed_by_key() {
        let mut container = LoaderContainer::new();
        container.register_loader("source-project", Arc::new(FixedLoader { name: "A" }));
        assert!(container.loader("source-project").is_some());
        assert!(container.loader("other").is_none());
    }
}
