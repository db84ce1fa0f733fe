//! A1-notation cell coordinates.

use crate::error::{Result, SyncError};
use std::fmt;

/// A column coordinate in A1 notation (`A`, `Z`, `AA`, `AD`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(String);

impl Column {
    pub fn parse(letters: &str) -> Result<Self> {
        let letters = letters.trim();
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SyncError::Layout(format!(
                "'{}' is not a column letter sequence",
                letters
            )));
        }
        Ok(Self(letters.to_ascii_uppercase()))
    }

    /// 1-based column number: `A` = 1, `Z` = 26, `AA` = 27.
    pub fn number(&self) -> u32 {
        self.0
            .bytes()
            .fold(0, |acc, b| acc * 26 + u32::from(b - b'A' + 1))
    }

    pub fn from_number(mut number: u32) -> Result<Self> {
        if number == 0 {
            return Err(SyncError::Layout("column numbers start at 1".to_string()));
        }
        let mut letters = Vec::new();
        while number > 0 {
            let rem = (number - 1) % 26;
            letters.push(b'A' + rem as u8);
            number = (number - 1) / 26;
        }
        letters.reverse();
        Ok(Self(String::from_utf8_lossy(&letters).into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{column}{row}`, e.g. `AB12`.
    pub fn cell(&self, row: u32) -> String {
        format!("{}{}", self.0, row)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefix a range with its tab name, quoting the name the way the Sheets API expects.
pub fn qualified_range(sheet_name: &str, range: &str) -> String {
    format!("'{}'!{}", sheet_name.replace('\'', "''"), range)
}
