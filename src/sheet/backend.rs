//! Sheet Backend Trait - batched cell access against one tab of a spreadsheet
//!
//! Ranges are plain A1 cells (`B5`, `AD12`); the backend qualifies them with the
//! tab name. Results come back in request order.

use crate::error::Result;
use crate::sheet::cell::Column;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One cell write inside a batched update. `None` clears the cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWrite {
    pub range: String,
    pub value: Option<String>,
}

impl CellWrite {
    pub fn new(range: impl Into<String>, value: Option<String>) -> Self {
        Self {
            range: range.into(),
            value,
        }
    }
}

#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Backend name, used in logs
    fn name(&self) -> &'static str;

    /// Read the first cell of every range in a single request.
    /// Empty cells come back as `None`.
    async fn batch_get(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<String>>>;

    /// Write every cell in a single request.
    async fn batch_update(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        writes: &[CellWrite],
    ) -> Result<()>;

    /// All values of one column, top to bottom, up to the last non-empty cell.
    async fn col_values(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        column: &Column,
    ) -> Result<Vec<String>>;
}
