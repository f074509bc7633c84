//! Child relation resolution
//!
//! Walks requested field paths such as `Lines.Taxes` through class metadata
//! and emits one `ChildRelation` per child collection reached.

use super::provider::MetadataProvider;
use super::types::{ChildRelation, EntityMetadata, PrimaryKeyPolicy};
use crate::error::Result;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Resolves requested fields into child relations, caching metadata per class
pub struct ChildRelationResolver<'a> {
    provider: &'a dyn MetadataProvider,
    policy: PrimaryKeyPolicy,
    cache: HashMap<String, EntityMetadata>,
}

impl<'a> ChildRelationResolver<'a> {
    /// Create a resolver using declared primary keys only
    pub fn new(provider: &'a dyn MetadataProvider) -> Self {
        Self {
            provider,
            policy: PrimaryKeyPolicy::declared(),
            cache: HashMap::new(),
        }
    }

    /// Set the primary key policy
    #[must_use]
    pub fn with_policy(mut self, policy: PrimaryKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The primary key policy in use
    pub fn policy(&self) -> &PrimaryKeyPolicy {
        &self.policy
    }

    /// Metadata for a class, fetched once per class name
    pub async fn metadata(&mut self, class_name: &str) -> Result<&EntityMetadata> {
        self.load(class_name).await?;
        Ok(&self.cache[class_name])
    }

    /// Primary keys for a class under the configured policy
    pub async fn primary_keys(&mut self, class_name: &str) -> Result<Vec<String>> {
        self.load(class_name).await?;
        Ok(self.policy.keys_for(&self.cache[class_name]))
    }

    /// Number of distinct classes fetched so far
    pub fn fetched_classes(&self) -> usize {
        self.cache.len()
    }

    async fn load(&mut self, class_name: &str) -> Result<()> {
        if !self.cache.contains_key(class_name) {
            debug!(class = class_name, "Fetching metadata");
            let metadata = self.provider.get_metadata(class_name).await?;
            self.cache.insert(class_name.to_string(), metadata);
        }
        Ok(())
    }

    /// Resolve the child relations named by `requested_fields`.
    ///
    /// Each entry may be a plain field name or a dotted path, optionally
    /// starting with the root class name. Segments that name no declared
    /// child stop the walk silently (they are scalars).
    /// The result is deduplicated by parent class and field name, in first
    /// resolution order.
    pub async fn resolve(
        &mut self,
        root_class: &str,
        requested_fields: &[String],
    ) -> Result<Vec<ChildRelation>> {
        let mut relations = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for requested in requested_fields {
            let mut segments: Vec<&str> = requested
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();

            if segments.len() > 1 && segments[0] == root_class {
                self.load(root_class).await?;
                if self.cache[root_class].child_class_for(root_class).is_none() {
                    segments.remove(0);
                }
            }

            let mut current_class = root_class.to_string();
            let mut path: Vec<&str> = Vec::with_capacity(segments.len());

            for segment in segments {
                self.load(&current_class).await?;
                let parent = &self.cache[&current_class];
                let Some(child_class) = parent.child_class_for(segment).map(str::to_string)
                else {
                    break;
                };
                let parent_primary_keys = self.policy.keys_for(parent);

                self.load(&child_class).await?;
                let child_primary_keys = self.policy.keys_for(&self.cache[&child_class]);

                path.push(segment);
                if seen.insert((current_class.clone(), segment.to_string())) {
                    relations.push(ChildRelation {
                        parent_class_name: current_class.clone(),
                        child_class_name: child_class.clone(),
                        field_name: segment.to_string(),
                        parent_primary_keys,
                        child_primary_keys,
                        path: path.join("."),
                    });
                }

                current_class = child_class;
            }
        }

        debug!(
            root = root_class,
            relations = relations.len(),
            "Resolved child relations"
        );
        Ok(relations)
    }
}
