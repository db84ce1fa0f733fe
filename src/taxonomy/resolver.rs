//! Attribute Resolution Engine
//!
//! Turns positional free-text inputs (attribute_1..attribute_10 of a row) into
//! `(collection_id, dataset_id)` pairs validated against the marketplace
//! taxonomy. Resolution runs in two steps:
//!
//! 1. [`ResolutionPlan::build`] walks the sorted top-level collections and
//!    appends dependent collections whenever the input chosen for a slot
//!    names a child that declares them. The plan fixes how many inputs are
//!    required.
//! 2. [`ResolutionPlan::resolve`] matches input `i` against the leaves of
//!    plan entry `i`. All-or-nothing: any failure discards the whole result.

use crate::error::{Result, SyncError};
use crate::taxonomy::model::{sort_by_order, ChildNode, CollectionNode};
use crate::taxonomy::source::{TaxonomyQuery, TaxonomySource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Sparse, 1-based positional inputs. Absent positions are absent, never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributeInputs {
    values: BTreeMap<usize, String>,
}

impl UserAttributeInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a dense sequence where the first item is position 1.
    pub fn from_positional<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let mut inputs = Self::new();
        for (i, item) in items.into_iter().enumerate() {
            if let Some(value) = item {
                inputs.insert(i + 1, value.as_ref());
            }
        }
        inputs
    }

    /// Store a trimmed value. Blank values and position 0 are ignored.
    pub fn insert(&mut self, position: usize, value: &str) -> bool {
        let value = value.trim();
        if position == 0 || value.is_empty() {
            return false;
        }
        self.values.insert(position, value.to_string());
        true
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.values.get(&position).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl<S: AsRef<str>> FromIterator<(usize, S)> for UserAttributeInputs {
    fn from_iter<T: IntoIterator<Item = (usize, S)>>(iter: T) -> Self {
        let mut inputs = Self::new();
        for (position, value) in iter {
            inputs.insert(position, value.as_ref());
        }
        inputs
    }
}

/// One resolved attribute. Serializes as the marketplace `offer_attributes` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAttribute {
    #[serde(skip)]
    pub position: usize,
    pub collection_id: String,
    pub dataset_id: String,
}

fn same_value(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// First leaf of `collection` whose value matches `input`, ignoring case and
/// surrounding whitespace.
pub fn match_leaf<'c>(collection: &'c CollectionNode, input: &str) -> Result<&'c ChildNode> {
    let leaves = collection.leaves();
    if let Some(leaf) = leaves.iter().find(|leaf| same_value(&leaf.value, input)) {
        return Ok(leaf);
    }

    let accepted: BTreeSet<String> = leaves.iter().map(|l| l.value.clone()).collect();
    Err(SyncError::InvalidAttributeValue {
        collection: collection.value.clone(),
        accepted: accepted.into_iter().collect(),
        input: input.to_string(),
    })
}

/// Ordered list of collections an input row must answer, one per position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPlan {
    collections: Vec<CollectionNode>,
}

impl ResolutionPlan {
    /// Sort the top level, then grow the plan with dependent collections of
    /// the children chosen by `inputs`.
    pub async fn build(
        mut top_level: Vec<CollectionNode>,
        inputs: &UserAttributeInputs,
        source: &dyn TaxonomySource,
    ) -> Result<Self> {
        sort_by_order(&mut top_level);
        let mut collections: Vec<CollectionNode> = Vec::with_capacity(top_level.len());

        for collection in top_level {
            collections.push(collection);
            // The slot this collection answers is fixed before any expansion.
            let slot = collections.len();
            let Some(chosen) = inputs.get(slot) else {
                debug!(
                    "No input at position {} for '{}', dependent collections not expanded",
                    slot, collections[slot - 1].value
                );
                continue;
            };

            let expansions: Vec<Vec<String>> = collections[slot - 1]
                .children
                .iter()
                .filter(|child| child.value == chosen && child.has_dependents())
                .map(ChildNode::dependent_ids)
                .collect();
            if expansions.len() > 1 {
                warn!(
                    "{} children of '{}' match '{}' and declare dependent collections; expanding all",
                    expansions.len(),
                    collections[slot - 1].value,
                    chosen
                );
            }

            for ids in expansions {
                let mut dependents = source.fetch_dependent_collections(&ids).await?;
                sort_by_order(&mut dependents);
                debug!(
                    "'{}' at position {} adds {} dependent collections",
                    chosen,
                    slot,
                    dependents.len()
                );
                collections.extend(dependents);
            }
        }

        Ok(Self { collections })
    }

    pub fn collections(&self) -> &[CollectionNode] {
        &self.collections
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Display values of every collection, in plan order.
    pub fn required_values(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.value.clone()).collect()
    }

    /// Match every plan position against its input.
    pub fn resolve(&self, inputs: &UserAttributeInputs) -> Result<Vec<ResolvedAttribute>> {
        let missing = || SyncError::MissingAttributes {
            required: self.required_values(),
        };
        if inputs.len() < self.collections.len() {
            return Err(missing());
        }

        self.collections
            .iter()
            .enumerate()
            .map(|(i, collection)| {
                let position = i + 1;
                let input = inputs.get(position).ok_or_else(missing)?;
                let leaf = match_leaf(collection, input)?;
                Ok(ResolvedAttribute {
                    position,
                    collection_id: leaf.collection_id.clone(),
                    dataset_id: leaf.dataset_id.clone(),
                })
            })
            .collect()
    }
}

pub struct AttributeResolver<'a> {
    source: &'a dyn TaxonomySource,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(source: &'a dyn TaxonomySource) -> Self {
        Self { source }
    }

    /// Resolve against an already fetched top level.
    pub async fn resolve(
        &self,
        top_level: Vec<CollectionNode>,
        inputs: &UserAttributeInputs,
    ) -> Result<Vec<ResolvedAttribute>> {
        let plan = ResolutionPlan::build(top_level, inputs, self.source).await?;
        plan.resolve(inputs)
    }

    /// Fetch a fresh taxonomy snapshot for `query` and resolve against it.
    pub async fn resolve_for(
        &self,
        query: &TaxonomyQuery,
        inputs: &UserAttributeInputs,
    ) -> Result<Vec<ResolvedAttribute>> {
        let top_level = self.source.fetch_collections(query).await?;
        info!(
            "Resolving {} inputs against {} collections (service {}, brand {})",
            inputs.len(),
            top_level.len(),
            query.service_id,
            query.brand_id
        );
        self.resolve(top_level, inputs).await
    }
}
