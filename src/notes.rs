//! Status notes written back to the Note and Timeline columns.

use chrono::NaiveDateTime;

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusNote {
    Created,
    Listed,
    ListedNoChange,
    Edited,
    Delisted,
    DelistedNoChange,
}

impl StatusNote {
    fn text(&self) -> &'static str {
        match self {
            StatusNote::Created => "Offer created",
            StatusNote::Listed => "Offer listed",
            StatusNote::ListedNoChange => "Offer already listed, no change needed",
            StatusNote::Edited => "Offer updated",
            StatusNote::Delisted => "Offer delisted",
            StatusNote::DelistedNoChange => "Offer already delisted, no change needed",
        }
    }

    pub fn message(&self, now: NaiveDateTime) -> String {
        format!("{}: {}", timeline(now), self.text())
    }
}

/// Value of the Timeline column: last time the row was touched.
pub fn timeline(now: NaiveDateTime) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

pub fn validation_failure(now: NaiveDateTime, row: u32) -> String {
    format!("{}: VALIDATION ERROR AT ROW: {}", timeline(now), row)
}

pub fn failure(now: NaiveDateTime, reason: &str) -> String {
    format!("{}: FAILED: {}", timeline(now), reason)
}
