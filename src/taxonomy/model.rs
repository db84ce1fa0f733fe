//! Taxonomy tree as served by the marketplace: top-level collections, each
//! owning an ordered tree of child nodes. Parents own their children; there
//! are no back-references.

use serde::{Deserialize, Serialize};

/// Reference from a child node to a collection that only applies once that
/// child has been chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentCollectionRef {
    pub collection_id: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub is_primary_img: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildNode {
    pub collection_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub value: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub total_children: u32,
    #[serde(default)]
    pub children: Vec<ChildNode>,
    #[serde(default, rename = "dpd_collections")]
    pub dependent_collections: Vec<DependentCollectionRef>,
}

impl ChildNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_dependents(&self) -> bool {
        !self.dependent_collections.is_empty()
    }

    pub fn dependent_ids(&self) -> Vec<String> {
        self.dependent_collections
            .iter()
            .map(|d| d.collection_id.clone())
            .collect()
    }

    /// Leaves of this subtree, depth-first, in declaration order.
    pub fn leaves(&self) -> Vec<&ChildNode> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                leaves.push(node);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLabel {
    #[serde(default)]
    pub id: Option<String>,
    pub en: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionNode {
    pub collection_id: String,
    /// Display value, e.g. "Platform"
    pub value: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub is_multiselect: bool,
    #[serde(default, rename = "input_field")]
    pub input_kind: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub label: Option<CollectionLabel>,
    #[serde(default)]
    pub children: Vec<ChildNode>,
}

impl CollectionNode {
    /// Every leaf under every direct child, in declaration order.
    pub fn leaves(&self) -> Vec<&ChildNode> {
        self.children.iter().flat_map(|c| c.leaves()).collect()
    }
}

/// Stable sort by `sort_order`; equal keys keep source order.
pub fn sort_by_order(collections: &mut [CollectionNode]) {
    collections.sort_by_key(|c| c.sort_order);
}
