//! Provider configuration and discovery.
//!
//! Providers are located through an explicit [`ProviderRegistry`] populated
//! at process start, keyed by a capability interface. There is no runtime
//! classpath scanning: registering zero or several candidates for a
//! capability surfaces as an explicit configuration error when the registry
//! is asked to resolve exactly one.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use entitylayer_core::provider::ProviderRegistry;
//!
//! let mut registry: ProviderRegistry<dyn MyFactory> = ProviderRegistry::new();
//! registry.register("memory", Arc::new(InMemoryFactory))?;
//!
//! let factory = registry.resolve()?;
//! # Ok::<(), entitylayer_core::error::EntityStoreError>(())
//! ```

use std::{any::type_name, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use serde::de::DeserializeOwned;

use crate::{
    error::{EntityStoreError, EntityStoreResult},
    manager::Manager,
};

/// Configuration handed to a provider factory.
///
/// Settings are an ordered map of name to BSON value with typed getters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: Document,
}

impl Settings {
    /// Creates an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an entry, replacing any prior value under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Bson>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.entries.get(key)
    }

    /// Returns the value for a key deserialized into the requested type.
    ///
    /// Returns `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::Conversion`] when the stored value is
    /// incompatible with the requested type.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> EntityStoreResult<Option<T>> {
        self.entries
            .get(key)
            .cloned()
            .map(|value| Ok(bson::de::deserialize_from_bson(value)?))
            .transpose()
    }

    /// Returns whether the settings map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Bson)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, Bson)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Factory trait implemented by providers to create configured managers.
#[async_trait]
pub trait ManagerFactory: Send + Sync {
    /// The manager type this factory produces.
    type Manager: Manager;

    /// Creates a manager from the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings are incomplete or the provider
    /// fails to initialize.
    async fn create(&self, settings: &Settings) -> EntityStoreResult<Self::Manager>;
}

/// An explicit registry of named providers for one capability interface.
///
/// The type parameter is the capability the registry serves, usually a trait
/// object such as `dyn SomeFactory`. Registration happens at process start;
/// resolution failures are configuration errors, never lazy discovery
/// failures.
#[derive(Debug, Clone)]
pub struct ProviderRegistry<P: ?Sized> {
    providers: Vec<(String, Arc<P>)>,
}

impl<P: ?Sized> ProviderRegistry<P> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registers a named provider.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::InvalidArgument`] when the name is
    /// already registered.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<P>,
    ) -> EntityStoreResult<()> {
        let name = name.into();

        if self.providers.iter().any(|(existing, _)| *existing == name) {
            return Err(EntityStoreError::InvalidArgument(format!(
                "provider {name} is already registered for {}",
                type_name::<P>()
            )));
        }

        self.providers.push((name, provider));
        Ok(())
    }

    /// Resolves the single registered provider.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::ProviderNotFound`] when the registry is
    /// empty and [`EntityStoreError::NonUniqueProvider`] when more than one
    /// candidate is registered.
    pub fn resolve(&self) -> EntityStoreResult<Arc<P>> {
        match self.providers.as_slice() {
            [] => Err(EntityStoreError::ProviderNotFound(
                type_name::<P>().to_string(),
            )),
            [(_, provider)] => Ok(Arc::clone(provider)),
            _ => Err(EntityStoreError::NonUniqueProvider(format!(
                "{} candidates registered for {}",
                self.providers.len(),
                type_name::<P>()
            ))),
        }
    }

    /// Resolves the provider registered under the given name.
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::ProviderNotFound`] when no provider with
    /// that name is registered.
    pub fn resolve_named(&self, name: &str) -> EntityStoreResult<Arc<P>> {
        self.providers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, provider)| Arc::clone(provider))
            .ok_or_else(|| {
                EntityStoreError::ProviderNotFound(format!(
                    "{name} for {}",
                    type_name::<P>()
                ))
            })
    }

    /// Returns the registered provider names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.providers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl<P: ?Sized> Default for ProviderRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
