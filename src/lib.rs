pub mod config;
pub mod error;
pub mod marketplace;
pub mod notes;
pub mod payload;
pub mod retry;
pub mod session;
pub mod sheet;
pub mod taxonomy;
pub mod workflow;

pub use error::{Result, SyncError};
pub use workflow::{OfferSync, PassSummary, RowOutcome};
