//! Metadata providers

use super::types::EntityMetadata;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of class metadata
///
/// Implementations fail with `Error::MetadataUnavailable` for unknown
/// classes or when the description cannot be fetched.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch the description of one class
    async fn get_metadata(&self, class_name: &str) -> Result<EntityMetadata>;
}

#[async_trait]
impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    async fn get_metadata(&self, class_name: &str) -> Result<EntityMetadata> {
        (**self).get_metadata(class_name).await
    }
}

/// In-memory metadata keyed by class name
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataProvider {
    classes: HashMap<String, EntityMetadata>,
}

impl StaticMetadataProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class
    #[must_use]
    pub fn with_class(mut self, metadata: EntityMetadata) -> Self {
        self.insert(metadata);
        self
    }

    /// Register a class in place
    pub fn insert(&mut self, metadata: EntityMetadata) {
        self.classes.insert(metadata.class_name.clone(), metadata);
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<EntityMetadata> for StaticMetadataProvider {
    fn from_iter<I: IntoIterator<Item = EntityMetadata>>(iter: I) -> Self {
        let mut provider = Self::new();
        for metadata in iter {
            provider.insert(metadata);
        }
        provider
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn get_metadata(&self, class_name: &str) -> Result<EntityMetadata> {
        self.classes
            .get(class_name)
            .cloned()
            .ok_or_else(|| Error::metadata(class_name, "unknown class"))
    }
}
