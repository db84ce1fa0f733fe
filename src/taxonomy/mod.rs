//! Marketplace attribute taxonomy: tree model, sources, and resolution of
//! free-text row inputs into attribute identifiers.

pub mod model;
pub mod resolver;
pub mod source;

pub use model::{ChildNode, CollectionNode, DependentCollectionRef};
pub use resolver::{AttributeResolver, ResolutionPlan, ResolvedAttribute, UserAttributeInputs};
pub use source::{StaticTaxonomy, TaxonomyQuery, TaxonomySource};
