//! Spreadsheet access: cell coordinates, backends, and the column-mapped
//! record store.

pub mod backend;
pub mod cell;
pub mod google;
pub mod memory;
pub mod offer;
pub mod record;

pub use backend::{CellWrite, SheetBackend};
pub use cell::Column;
pub use google::GoogleSheetsBackend;
pub use memory::MemorySheet;
pub use offer::{OfferRow, ProcessType};
pub use record::{ColumnMapped, ColumnSpec, RecordStore, RowKey};
