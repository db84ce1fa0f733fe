//! In-memory sheet backend. Counts round trips so callers can check batching.

use crate::error::{Result, SyncError};
use crate::sheet::backend::{CellWrite, SheetBackend};
use crate::sheet::cell::Column;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type TabKey = (String, String);

#[derive(Default)]
struct Inner {
    tabs: Mutex<HashMap<TabKey, BTreeMap<String, String>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_next_writes: AtomicUsize,
}

/// Cloning shares the same cells and counters.
#[derive(Clone, Default)]
pub struct MemorySheet {
    inner: Arc<Inner>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, sheet_id: &str, sheet_name: &str, cell: &str, value: &str) {
        let mut tabs = self.inner.tabs.lock().unwrap();
        let tab = tabs
            .entry((sheet_id.to_string(), sheet_name.to_string()))
            .or_default();
        if value.is_empty() {
            tab.remove(&cell.to_ascii_uppercase());
        } else {
            tab.insert(cell.to_ascii_uppercase(), value.to_string());
        }
    }

    pub fn value(&self, sheet_id: &str, sheet_name: &str, cell: &str) -> Option<String> {
        let tabs = self.inner.tabs.lock().unwrap();
        tabs.get(&(sheet_id.to_string(), sheet_name.to_string()))
            .and_then(|tab| tab.get(&cell.to_ascii_uppercase()).cloned())
    }

    /// Snapshot of one tab, keyed by cell.
    pub fn snapshot(&self, sheet_id: &str, sheet_name: &str) -> BTreeMap<String, String> {
        let tabs = self.inner.tabs.lock().unwrap();
        tabs.get(&(sheet_id.to_string(), sheet_name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn read_calls(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make the next `n` batch updates fail with a network error.
    pub fn fail_next_writes(&self, n: usize) {
        self.inner.fail_next_writes.store(n, Ordering::SeqCst);
    }
}

/// Split `AD12` into (`AD`, 12).
fn split_cell(cell: &str) -> Option<(String, u32)> {
    let pos = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(pos);
    Some((letters.to_ascii_uppercase(), digits.parse().ok()?))
}

#[async_trait]
impl SheetBackend for MemorySheet {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn batch_get(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<String>>> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        Ok(ranges
            .iter()
            .map(|range| self.value(sheet_id, sheet_name, range))
            .collect())
    }

    async fn batch_update(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        writes: &[CellWrite],
    ) -> Result<()> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let pending_failures = self.inner.fail_next_writes.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.inner
                .fail_next_writes
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(SyncError::Network("429 rate limited".to_string()));
        }
        for write in writes {
            self.set(
                sheet_id,
                sheet_name,
                &write.range,
                write.value.as_deref().unwrap_or(""),
            );
        }
        Ok(())
    }

    async fn col_values(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        column: &Column,
    ) -> Result<Vec<String>> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.snapshot(sheet_id, sheet_name);
        let cells: BTreeMap<u32, String> = snapshot
            .into_iter()
            .filter_map(|(cell, value)| {
                let (letters, row) = split_cell(&cell)?;
                (letters == column.as_str()).then_some((row, value))
            })
            .collect();
        let last = cells.keys().next_back().copied().unwrap_or(0);
        Ok((1..=last)
            .map(|row| cells.get(&row).cloned().unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_col_values_pads_gaps() {
        let sheet = MemorySheet::new();
        sheet.set("s", "t", "B1", "Check");
        sheet.set("s", "t", "B3", "LIST");
        sheet.set("s", "t", "C9", "ignored");

        let values = sheet
            .col_values("s", "t", &Column::parse("B").unwrap())
            .await
            .unwrap();
        assert_eq!(values, vec!["Check".to_string(), String::new(), "LIST".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_on_none_write() {
        let sheet = MemorySheet::new();
        sheet.set("s", "t", "C2", "old note");
        sheet
            .batch_update("s", "t", &[CellWrite::new("C2", None)])
            .await
            .unwrap();
        assert_eq!(sheet.value("s", "t", "C2"), None);
        assert_eq!(sheet.write_calls(), 1);
    }
}
