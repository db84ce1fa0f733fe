//! Column-Mapped Record Store
//!
//! A record type declares its `(field, column)` table once, as a `'static`
//! slice in declaration order. The store turns that table into batched range
//! reads and writes: every operation is a single round trip to the backend,
//! whatever the number of rows.

use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;
use crate::sheet::backend::{CellWrite, SheetBackend};
use crate::sheet::cell::Column;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// One mapped field: its name and the column it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub column: &'static str,
}

pub const fn col(field: &'static str, column: &'static str) -> ColumnSpec {
    ColumnSpec { field, column }
}

/// Where a record lives: spreadsheet, tab, 1-based row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RowKey {
    pub sheet_id: String,
    pub sheet_name: String,
    pub index: u32,
}

impl RowKey {
    pub fn new(sheet_id: impl Into<String>, sheet_name: impl Into<String>, index: u32) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
            index,
        }
    }
}

/// A record whose fields map 1:1 onto cells of one row.
pub trait ColumnMapped: Sized + Send + Sync {
    /// Field-to-column table, in declaration order.
    const COLUMNS: &'static [ColumnSpec];

    fn row_key(&self) -> &RowKey;

    /// Build the record from the cells of one row. Values are already trimmed;
    /// empty cells are `None`.
    fn from_cells(key: RowKey, cells: CellReader) -> Result<Self>;

    /// Cell values in `COLUMNS` order.
    fn to_cells(&self) -> Vec<Option<String>>;
}

/// Reject tables with duplicate columns, duplicate fields or bad letters.
pub fn validate_layout(columns: &[ColumnSpec]) -> Result<Vec<Column>> {
    if columns.is_empty() {
        return Err(SyncError::Layout("record declares no columns".to_string()));
    }
    let mut seen_columns = HashSet::new();
    let mut seen_fields = HashSet::new();
    let mut parsed = Vec::with_capacity(columns.len());

    for entry in columns {
        let column = Column::parse(entry.column)?;
        if !seen_columns.insert(column.clone()) {
            return Err(SyncError::Layout(format!(
                "column {} is mapped more than once (field '{}')",
                column, entry.field
            )));
        }
        if !seen_fields.insert(entry.field) {
            return Err(SyncError::Layout(format!(
                "field '{}' is mapped more than once",
                entry.field
            )));
        }
        parsed.push(column);
    }
    Ok(parsed)
}

/// Typed value parsed from a cell.
pub trait FromCell: Sized + Default {
    const KIND: &'static str;
    fn from_cell(raw: &str) -> Option<Self>;
}

impl FromCell for String {
    const KIND: &'static str = "string";
    fn from_cell(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromCell for f64 {
    const KIND: &'static str = "number";
    fn from_cell(raw: &str) -> Option<Self> {
        raw.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl FromCell for i64 {
    const KIND: &'static str = "integer";
    fn from_cell(raw: &str) -> Option<Self> {
        let cleaned = raw.replace(',', "");
        if let Ok(v) = cleaned.parse::<i64>() {
            return Some(v);
        }
        // Sheets hands whole numbers back as `3.0` in some render modes
        let float = cleaned.parse::<f64>().ok()?;
        (float.fract() == 0.0 && float.abs() < i64::MAX as f64).then_some(float as i64)
    }
}

impl FromCell for u32 {
    const KIND: &'static str = "non-negative integer";
    fn from_cell(raw: &str) -> Option<Self> {
        i64::from_cell(raw).and_then(|v| u32::try_from(v).ok())
    }
}

/// Field-name access to the cells of one row. Collects every contract
/// violation so a row reports all its problems at once.
pub struct CellReader {
    row: u32,
    columns: &'static [ColumnSpec],
    cells: Vec<Option<String>>,
    errors: Vec<String>,
}

impl CellReader {
    pub fn new(row: u32, columns: &'static [ColumnSpec], cells: Vec<Option<String>>) -> Self {
        Self {
            row,
            columns,
            cells,
            errors: Vec::new(),
        }
    }

    fn raw(&mut self, field: &str) -> Option<String> {
        match self.columns.iter().position(|c| c.field == field) {
            Some(pos) => self.cells.get(pos).cloned().flatten(),
            None => {
                self.errors.push(format!("{}: field is not mapped", field));
                None
            }
        }
    }

    pub fn optional<T: FromCell>(&mut self, field: &str) -> Option<T> {
        let raw = self.raw(field)?;
        match T::from_cell(&raw) {
            Some(v) => Some(v),
            None => {
                self.errors
                    .push(format!("{}: '{}' is not a valid {}", field, raw, T::KIND));
                None
            }
        }
    }

    pub fn required<T: FromCell>(&mut self, field: &str) -> T {
        if let Some(pos) = self.columns.iter().position(|c| c.field == field) {
            if self.cells.get(pos).map_or(true, Option::is_none) {
                self.errors.push(format!("{}: field required", field));
                return T::default();
            }
        }
        self.optional(field).unwrap_or_default()
    }

    pub fn or_default<T: FromCell>(&mut self, field: &str, default: T) -> T {
        self.optional(field).unwrap_or(default)
    }

    /// The row's cell text as read, for writing unchanged values back verbatim.
    pub fn source(&self) -> SourceCells {
        SourceCells {
            columns: self.columns,
            cells: self.cells.clone(),
        }
    }

    /// Ok when no accessor recorded a violation.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SyncError::validation(self.row, self.errors.join("; ")))
        }
    }
}

/// Render a value for a cell write.
pub fn cell<T: ToString>(value: &T) -> Option<String> {
    Some(value.to_string())
}

pub fn opt_cell<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

/// Cell text of one row as it was read.
///
/// Rendering through it keeps the original text while it still parses to the
/// value being written, so `12.50` or `1,000` survive an unchanged update
/// instead of being rewritten as `12.5` and `1000`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCells {
    columns: &'static [ColumnSpec],
    cells: Vec<Option<String>>,
}

impl SourceCells {
    fn raw(&self, field: &str) -> Option<&str> {
        let pos = self.columns.iter().position(|c| c.field == field)?;
        self.cells.get(pos)?.as_deref()
    }

    pub fn cell<T: FromCell + PartialEq + ToString>(&self, field: &str, value: &T) -> Option<String> {
        match self.raw(field) {
            Some(raw) if T::from_cell(raw).as_ref() == Some(value) => Some(raw.to_string()),
            _ => cell(value),
        }
    }

    pub fn opt_cell<T: FromCell + PartialEq + ToString>(
        &self,
        field: &str,
        value: &Option<T>,
    ) -> Option<String> {
        value.as_ref().and_then(|v| self.cell(field, v))
    }
}

fn normalize(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub struct RecordStore<B> {
    backend: B,
    write_policy: RetryPolicy,
}

impl<B: SheetBackend> RecordStore<B> {
    pub fn new(backend: B, write_policy: RetryPolicy) -> Self {
        Self {
            backend,
            write_policy,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read one row.
    pub async fn get<R: ColumnMapped>(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        index: u32,
    ) -> Result<R> {
        let mut records = self.read_rows::<R>(sheet_id, sheet_name, &[index]).await?;
        records
            .pop()
            .ok_or_else(|| SyncError::validation(index, "row returned no cells"))
    }

    /// Read many rows in a single request. Output order follows `indexes`.
    pub async fn batch_get<R: ColumnMapped>(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        indexes: &[u32],
    ) -> Result<Vec<R>> {
        if indexes.is_empty() {
            return Ok(Vec::new());
        }
        self.read_rows(sheet_id, sheet_name, indexes).await
    }

    async fn read_rows<R: ColumnMapped>(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        indexes: &[u32],
    ) -> Result<Vec<R>> {
        let columns = validate_layout(R::COLUMNS)?;
        if let Some(bad) = indexes.iter().find(|i| **i == 0) {
            return Err(SyncError::validation(*bad, "row indexes start at 1"));
        }

        // Row-major: all fields of the first row, then the next row.
        let ranges: Vec<String> = indexes
            .iter()
            .flat_map(|index| columns.iter().map(move |c| c.cell(*index)))
            .collect();

        debug!(
            "Reading {} rows x {} fields from '{}' via {}",
            indexes.len(),
            columns.len(),
            sheet_name,
            self.backend.name()
        );
        let results = self.backend.batch_get(sheet_id, sheet_name, &ranges).await?;
        if results.len() != ranges.len() {
            return Err(SyncError::Network(format!(
                "backend returned {} cells for {} ranges",
                results.len(),
                ranges.len()
            )));
        }

        let mut cells = results.into_iter().map(normalize);
        let mut records = Vec::with_capacity(indexes.len());
        for index in indexes {
            let row: Vec<Option<String>> = cells.by_ref().take(columns.len()).collect();
            let key = RowKey::new(sheet_id, sheet_name, *index);
            let reader = CellReader::new(*index, R::COLUMNS, row);
            records.push(R::from_cells(key, reader)?);
        }
        Ok(records)
    }

    fn record_writes<R: ColumnMapped>(columns: &[Column], record: &R) -> Result<Vec<CellWrite>> {
        let values = record.to_cells();
        let index = record.row_key().index;
        if values.len() != columns.len() {
            return Err(SyncError::Layout(format!(
                "record produced {} cells for {} columns",
                values.len(),
                columns.len()
            )));
        }
        if index == 0 {
            return Err(SyncError::validation(index, "row indexes start at 1"));
        }
        Ok(columns
            .iter()
            .zip(values)
            .map(|(column, value)| CellWrite::new(column.cell(index), value))
            .collect())
    }

    /// Overwrite every mapped cell of the record's row.
    pub async fn update<R: ColumnMapped>(&self, record: &R) -> Result<()> {
        let columns = validate_layout(R::COLUMNS)?;
        let writes = Self::record_writes(&columns, record)?;
        let key = record.row_key();
        self.update_cells(&key.sheet_id, &key.sheet_name, writes).await
    }

    /// Overwrite every mapped cell of every record in one request.
    pub async fn batch_update<R: ColumnMapped>(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        records: &[R],
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let columns = validate_layout(R::COLUMNS)?;
        let mut writes = Vec::with_capacity(records.len() * columns.len());
        for record in records {
            writes.extend(Self::record_writes(&columns, record)?);
        }
        self.update_cells(sheet_id, sheet_name, writes).await
    }

    /// Write arbitrary cells in one request, under the write retry policy.
    pub async fn update_cells(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        writes: Vec<CellWrite>,
    ) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let backend = &self.backend;
        let writes = &writes;
        self.write_policy
            .run("sheet batch update", move || {
                backend.batch_update(sheet_id, sheet_name, writes)
            })
            .await
    }
}
