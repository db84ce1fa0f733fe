//! Taxonomy Source Trait - where collection trees come from
//!
//! Neither call guarantees ordering; callers sort by `sort_order`.

use crate::error::{Result, SyncError};
use crate::taxonomy::model::CollectionNode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identifies the taxonomy of one listing category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyQuery {
    pub service_id: String,
    pub brand_id: String,
    pub region_id: Option<String>,
}

#[async_trait]
pub trait TaxonomySource: Send + Sync {
    /// Top-level collections of a category.
    async fn fetch_collections(&self, query: &TaxonomyQuery) -> Result<Vec<CollectionNode>>;

    /// Dependent collections referenced by a chosen child.
    async fn fetch_dependent_collections(
        &self,
        collection_ids: &[String],
    ) -> Result<Vec<CollectionNode>>;
}

/// Fixed, in-memory taxonomy. Counts dependent fetches.
#[derive(Default)]
pub struct StaticTaxonomy {
    collections: Vec<CollectionNode>,
    dependents: HashMap<String, CollectionNode>,
    dependent_fetches: AtomicUsize,
}

impl StaticTaxonomy {
    pub fn new(collections: Vec<CollectionNode>) -> Self {
        Self {
            collections,
            ..Self::default()
        }
    }

    pub fn with_dependent(mut self, collection: CollectionNode) -> Self {
        self.dependents
            .insert(collection.collection_id.clone(), collection);
        self
    }

    pub fn dependent_fetches(&self) -> usize {
        self.dependent_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaxonomySource for StaticTaxonomy {
    async fn fetch_collections(&self, _query: &TaxonomyQuery) -> Result<Vec<CollectionNode>> {
        Ok(self.collections.clone())
    }

    async fn fetch_dependent_collections(
        &self,
        collection_ids: &[String],
    ) -> Result<Vec<CollectionNode>> {
        self.dependent_fetches.fetch_add(1, Ordering::SeqCst);
        collection_ids
            .iter()
            .map(|id| {
                self.dependents.get(id).cloned().ok_or_else(|| {
                    SyncError::Network(format!("dependent collection {} not found", id))
                })
            })
            .collect()
    }
}
