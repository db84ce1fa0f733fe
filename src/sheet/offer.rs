//! Offer task row: one spreadsheet row per marketplace listing.

use crate::error::{Result, SyncError};
use crate::sheet::backend::SheetBackend;
use crate::sheet::cell::Column;
use crate::sheet::record::{col, CellReader, ColumnMapped, ColumnSpec, RowKey, SourceCells};
use crate::taxonomy::resolver::UserAttributeInputs;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Column holding the action marker.
pub const CHECK_COLUMN: &str = "B";
/// Column receiving status and failure notes.
pub const NOTE_COLUMN: &str = "C";
/// Free-text attribute inputs live in `attribute_1..attribute_N`.
pub const ATTRIBUTE_SLOTS: usize = 10;

/// Action requested by the Check column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    List,
    Edit,
    Delist,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessType::List => "LIST",
            ProcessType::Edit => "EDIT",
            ProcessType::Delist => "DELIST",
        }
    }
}

impl FromStr for ProcessType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "LIST" => Ok(ProcessType::List),
            "EDIT" => Ok(ProcessType::Edit),
            "DELIST" => Ok(ProcessType::Delist),
            other => Err(format!("unknown process type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferRow {
    pub key: RowKey,
    pub check: String,
    pub note: Option<String>,
    pub timeline: Option<String>,
    pub offer_id: Option<String>,
    pub admin: Option<String>,
    pub seller: Option<String>,
    pub create_offer_link: String,
    pub title: String,
    pub description: String,
    pub media_gallery: Option<String>,
    pub currency: String,
    pub unit_price: f64,
    pub delivery_method: String,
    pub stock: i64,
    pub minimum_purchase_quantity: i64,
    pub delivery_speed_min: i64,
    pub delivery_speed_max: i64,
    pub delivery_time: i64,
    pub region: String,
    pub attributes: [Option<String>; ATTRIBUTE_SLOTS],
    /// Seconds to pause after processing this row
    pub relax: Option<f64>,
    #[serde(skip)]
    pub source: SourceCells,
}

const ATTRIBUTE_FIELDS: [&str; ATTRIBUTE_SLOTS] = [
    "attribute_1",
    "attribute_2",
    "attribute_3",
    "attribute_4",
    "attribute_5",
    "attribute_6",
    "attribute_7",
    "attribute_8",
    "attribute_9",
    "attribute_10",
];

impl ColumnMapped for OfferRow {
    const COLUMNS: &'static [ColumnSpec] = &[
        col("check", CHECK_COLUMN),
        col("note", NOTE_COLUMN),
        col("timeline", "D"),
        col("offer_id", "E"),
        col("admin", "F"),
        col("seller", "G"),
        col("create_offer_link", "H"),
        col("title", "I"),
        col("description", "J"),
        col("media_gallery", "K"),
        col("currency", "L"),
        col("unit_price", "M"),
        col("delivery_method", "N"),
        col("stock", "O"),
        col("minimum_purchase_quantity", "P"),
        col("delivery_speed_min", "Q"),
        col("delivery_speed_max", "R"),
        col("delivery_time", "S"),
        col("region", "T"),
        col("attribute_1", "U"),
        col("attribute_2", "V"),
        col("attribute_3", "W"),
        col("attribute_4", "X"),
        col("attribute_5", "Y"),
        col("attribute_6", "Z"),
        col("attribute_7", "AA"),
        col("attribute_8", "AB"),
        col("attribute_9", "AC"),
        col("attribute_10", "AD"),
        col("relax", "AE"),
    ];

    fn row_key(&self) -> &RowKey {
        &self.key
    }

    fn from_cells(key: RowKey, mut cells: CellReader) -> Result<Self> {
        let row = Self {
            source: cells.source(),
            check: cells.required("check"),
            note: cells.optional("note"),
            timeline: cells.optional("timeline"),
            offer_id: cells.optional("offer_id"),
            admin: cells.optional("admin"),
            seller: cells.optional("seller"),
            create_offer_link: cells.required("create_offer_link"),
            title: cells.required("title"),
            description: cells.required("description"),
            media_gallery: cells.optional("media_gallery"),
            currency: cells.required("currency"),
            unit_price: cells.required("unit_price"),
            delivery_method: cells.required("delivery_method"),
            stock: cells.required("stock"),
            minimum_purchase_quantity: cells.required("minimum_purchase_quantity"),
            delivery_speed_min: cells.required("delivery_speed_min"),
            delivery_speed_max: cells.required("delivery_speed_max"),
            delivery_time: cells.required("delivery_time"),
            region: cells.required("region"),
            attributes: ATTRIBUTE_FIELDS.map(|field| cells.optional(field)),
            relax: cells.optional("relax"),
            key,
        };
        cells.finish()?;
        Ok(row)
    }

    fn to_cells(&self) -> Vec<Option<String>> {
        let src = &self.source;
        let mut values = vec![
            src.cell("check", &self.check),
            src.opt_cell("note", &self.note),
            src.opt_cell("timeline", &self.timeline),
            src.opt_cell("offer_id", &self.offer_id),
            src.opt_cell("admin", &self.admin),
            src.opt_cell("seller", &self.seller),
            src.cell("create_offer_link", &self.create_offer_link),
            src.cell("title", &self.title),
            src.cell("description", &self.description),
            src.opt_cell("media_gallery", &self.media_gallery),
            src.cell("currency", &self.currency),
            src.cell("unit_price", &self.unit_price),
            src.cell("delivery_method", &self.delivery_method),
            src.cell("stock", &self.stock),
            src.cell("minimum_purchase_quantity", &self.minimum_purchase_quantity),
            src.cell("delivery_speed_min", &self.delivery_speed_min),
            src.cell("delivery_speed_max", &self.delivery_speed_max),
            src.cell("delivery_time", &self.delivery_time),
            src.cell("region", &self.region),
        ];
        values.extend(
            ATTRIBUTE_FIELDS
                .iter()
                .zip(&self.attributes)
                .map(|(field, value)| src.opt_cell(field, value)),
        );
        values.push(src.opt_cell("relax", &self.relax));
        values
    }
}

impl OfferRow {
    pub fn process_type(&self) -> Option<ProcessType> {
        self.check.parse().ok()
    }

    /// Positional attribute inputs, attribute_1 at position 1.
    pub fn attribute_inputs(&self) -> UserAttributeInputs {
        UserAttributeInputs::from_positional(self.attributes.iter().map(|a| a.as_deref()))
    }

    /// Pause after this row. Values too large for a `Duration` fail the row.
    pub fn relax_duration(&self) -> Result<Duration> {
        let secs = self.relax.unwrap_or(0.0).max(0.0);
        Duration::try_from_secs_f64(secs).map_err(|_| {
            SyncError::validation(self.key.index, format!("relax: {} seconds is out of range", secs))
        })
    }

    /// 1-based indexes of rows whose Check column holds a process type.
    pub async fn run_indexes<B: SheetBackend + ?Sized>(
        backend: &B,
        sheet_id: &str,
        sheet_name: &str,
    ) -> Result<Vec<u32>> {
        let column = Column::parse(CHECK_COLUMN)?;
        let values = backend.col_values(sheet_id, sheet_name, &column).await?;
        Ok(values
            .iter()
            .enumerate()
            .filter(|(_, value)| value.parse::<ProcessType>().is_ok())
            .map(|(i, _)| i as u32 + 1)
            .collect())
    }
}
