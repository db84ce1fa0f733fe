//! Google Sheets v4 REST backend.

use crate::error::{Result, SyncError};
use crate::sheet::backend::{CellWrite, SheetBackend};
use crate::sheet::cell::{qualified_range, Column};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

pub struct GoogleSheetsBackend {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleSheetsBackend {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn spreadsheet_url(&self, sheet_id: &str) -> String {
        format!("{}/v4/spreadsheets/{}", self.base_url, sheet_id)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("Sheets API returned {}: {}", status, body);
        Err(SyncError::Network(format!("Sheets API returned {}: {}", status, body)))
    }
}

/// Unformatted values arrive as JSON strings, numbers or booleans.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl SheetBackend for GoogleSheetsBackend {
    fn name(&self) -> &'static str {
        "google-sheets"
    }

    async fn batch_get(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        ranges: &[String],
    ) -> Result<Vec<Option<String>>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Sheets batchGet of {} ranges on '{}'", ranges.len(), sheet_name);

        let mut query: Vec<(&str, String)> = ranges
            .iter()
            .map(|r| ("ranges", qualified_range(sheet_name, r)))
            .collect();
        query.push(("majorDimension", "ROWS".to_string()));
        query.push(("valueRenderOption", "UNFORMATTED_VALUE".to_string()));

        let response = self
            .client
            .get(format!("{}/values:batchGet", self.spreadsheet_url(sheet_id)))
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;
        let parsed: BatchGetResponse = Self::check(response).await?.json().await?;

        if parsed.value_ranges.len() != ranges.len() {
            return Err(SyncError::Network(format!(
                "Sheets API returned {} ranges for {} requested",
                parsed.value_ranges.len(),
                ranges.len()
            )));
        }

        Ok(parsed
            .value_ranges
            .iter()
            .map(|vr| vr.values.first().and_then(|row| row.first()).and_then(cell_text))
            .collect())
    }

    async fn batch_update(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        writes: &[CellWrite],
    ) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        debug!("Sheets batchUpdate of {} cells on '{}'", writes.len(), sheet_name);

        let data: Vec<Value> = writes
            .iter()
            .map(|w| {
                json!({
                    "range": qualified_range(sheet_name, &w.range),
                    "values": [[w.value.clone().unwrap_or_default()]],
                })
            })
            .collect();
        let body = json!({
            "valueInputOption": "USER_ENTERED",
            "data": data,
        });

        let response = self
            .client
            .post(format!("{}/values:batchUpdate", self.spreadsheet_url(sheet_id)))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn col_values(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        column: &Column,
    ) -> Result<Vec<String>> {
        let range = qualified_range(sheet_name, &format!("{0}:{0}", column));
        let mut url = reqwest::Url::parse(&format!("{}/values", self.spreadsheet_url(sheet_id)))
            .map_err(|e| SyncError::Config(format!("Invalid Sheets API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config("Sheets API URL cannot take a path".to_string()))?
            .push(&range);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("majorDimension", "COLUMNS")])
            .send()
            .await?;
        let parsed: ValueRange = Self::check(response).await?.json().await?;

        Ok(parsed
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(|v| cell_text(v).unwrap_or_default())
            .collect())
    }
}
