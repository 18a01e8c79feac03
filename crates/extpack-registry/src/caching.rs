use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use extpack_core::{ExtensionDependency, ExtensionMetadata, ExtensionProvider};

// Errors are not cached, so a later lookup retries the inner provider.
#[derive(Debug)]
pub struct CachingProvider<P> {
    inner: P,
    cache: Mutex<HashMap<ExtensionDependency, Vec<ExtensionMetadata>>>,
}

impl<P> CachingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cached_lookups(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<P> ExtensionProvider for CachingProvider<P>
where
    P: ExtensionProvider,
{
    fn dependency_metadata(
        &self,
        dependency: &ExtensionDependency,
    ) -> Result<Vec<ExtensionMetadata>> {
        if let Some(cached) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dependency)
        {
            tracing::trace!(dependency = %dependency, "catalog cache hit");
            return Ok(cached.clone());
        }

        // The lock is released while the inner provider runs.
        let found = self.inner.dependency_metadata(dependency)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dependency.clone(), found.clone());
        Ok(found)
    }
}
