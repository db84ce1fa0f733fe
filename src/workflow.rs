//! Row Workflows - LIST / EDIT / DELIST for one sheet row at a time
//!
//! A pass scans the Check column for runnable rows and processes them in
//! order. A failing row gets a note in the Note column and the pass moves on;
//! only the initial scan can abort a pass.

use crate::error::{Result, SyncError};
use crate::marketplace::client::OfferApi;
use crate::marketplace::jwt;
use crate::marketplace::models::{ListingQuery, OfferStatus};
use crate::notes::{self, StatusNote};
use crate::payload::prepare_payload;
use crate::sheet::backend::{CellWrite, SheetBackend};
use crate::sheet::cell::Column;
use crate::sheet::offer::{OfferRow, ProcessType, NOTE_COLUMN};
use crate::sheet::record::RecordStore;
use crate::session::TokenProvider;
use crate::taxonomy::resolver::{AttributeResolver, ResolvedAttribute};
use crate::taxonomy::source::TaxonomySource;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowOutcome {
    Created,
    Listed,
    AlreadyListed,
    Edited,
    Delisted,
    AlreadyDelisted,
    /// Check column no longer holds a process type
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub interrupted: bool,
}

pub struct OfferSync<B> {
    store: RecordStore<B>,
    offers: Arc<dyn OfferApi>,
    taxonomy: Arc<dyn TaxonomySource>,
    session: Arc<dyn TokenProvider>,
    sheet_id: String,
    sheet_name: String,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Resolve a row's attributes without touching the marketplace or writing to the sheet.
pub async fn resolve_row<B: SheetBackend>(
    store: &RecordStore<B>,
    sheet_id: &str,
    sheet_name: &str,
    index: u32,
    taxonomy: &dyn TaxonomySource,
) -> Result<Vec<ResolvedAttribute>> {
    let row: OfferRow = store.get(sheet_id, sheet_name, index).await?;
    let listing = ListingQuery::from_url(&row.create_offer_link)?;
    AttributeResolver::new(taxonomy)
        .resolve_for(&listing.taxonomy_query(), &row.attribute_inputs())
        .await
}

impl<B: SheetBackend> OfferSync<B> {
    pub fn new(
        store: RecordStore<B>,
        offers: Arc<dyn OfferApi>,
        taxonomy: Arc<dyn TaxonomySource>,
        session: Arc<dyn TokenProvider>,
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            offers,
            taxonomy,
            session,
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    /// Rows whose Check column asks for an action.
    pub async fn run_indexes(&self) -> Result<Vec<u32>> {
        OfferRow::run_indexes(self.store.backend(), &self.sheet_id, &self.sheet_name).await
    }

    /// Process every runnable row once. `stop` is checked between rows.
    pub async fn run_pass(&self, stop: &AtomicBool) -> Result<PassSummary> {
        if let Err(e) = self.session.refresh().await {
            warn!("Session refresh failed: {}", e);
        }

        let indexes = self.run_indexes().await?;
        info!("Run index: {:?}", indexes);

        let mut summary = PassSummary::default();
        for index in indexes {
            if stop.load(Ordering::SeqCst) {
                info!("Stop requested, leaving pass before row {}", index);
                summary.interrupted = true;
                break;
            }

            info!("INDEX (ROW): {}", index);
            summary.processed += 1;
            match self.process_index(index).await {
                Ok(outcome) => {
                    info!("Row {} finished: {:?}", index, outcome);
                    summary.succeeded += 1;
                }
                Err(e) => {
                    error!("FAILED AT ROW: {}: {}", index, e);
                    summary.failed += 1;
                    self.record_failure(index, &e).await;
                }
            }
        }
        Ok(summary)
    }

    /// Read one row and run its workflow, then honour its relax time.
    pub async fn process_index(&self, index: u32) -> Result<RowOutcome> {
        let row: OfferRow = self.store.get(&self.sheet_id, &self.sheet_name, index).await?;
        let relax = row.relax_duration()?;
        let outcome = self.process_row(row).await?;
        if !relax.is_zero() {
            info!("Sleep for {:?}", relax);
            tokio::time::sleep(relax).await;
        }
        Ok(outcome)
    }

    pub async fn process_row(&self, row: OfferRow) -> Result<RowOutcome> {
        match row.process_type() {
            Some(ProcessType::List) => self.list(row).await,
            Some(ProcessType::Edit) => self.edit(row).await,
            Some(ProcessType::Delist) => self.delist(row).await,
            None => {
                warn!("Row {} has check value '{}', skipping", row.key.index, row.check);
                Ok(RowOutcome::Skipped)
            }
        }
    }

    async fn list(&self, row: OfferRow) -> Result<RowOutcome> {
        info!("LIST flow");
        let Some(offer_id) = row.offer_id.clone() else {
            return self.create(row).await;
        };

        let token = self.session.bearer_token().await?;
        let offer = self.offers.get_offer(&offer_id, &token).await?;
        if offer.has_status(OfferStatus::Live) {
            info!("Offer listed. No need to change");
            self.write_status(row, StatusNote::ListedNoChange).await?;
            return Ok(RowOutcome::AlreadyListed);
        }

        info!("Change offer status to live");
        let seller_id = jwt::seller_id(&token)?;
        self.offers
            .bulk_update_status(&seller_id, &offer_id, OfferStatus::Live, &token)
            .await?;
        self.write_status(row, StatusNote::Listed).await?;
        Ok(RowOutcome::Listed)
    }

    async fn create(&self, mut row: OfferRow) -> Result<RowOutcome> {
        info!("Create offer");
        let token = self.session.bearer_token().await?;
        let payload = prepare_payload(&row, &token, self.taxonomy.as_ref()).await?;
        let created = self.offers.create_offer(&payload, &token).await?;

        row.offer_id = Some(created.offer_id);
        self.write_status(row, StatusNote::Created).await?;
        Ok(RowOutcome::Created)
    }

    async fn edit(&self, row: OfferRow) -> Result<RowOutcome> {
        info!("EDIT flow");
        let offer_id = row
            .offer_id
            .clone()
            .ok_or_else(|| SyncError::Workflow("Must include Offer ID to edit".to_string()))?;

        let token = self.session.bearer_token().await?;
        let payload = prepare_payload(&row, &token, self.taxonomy.as_ref()).await?;
        self.offers.update_offer(&offer_id, &payload, &token).await?;
        self.write_status(row, StatusNote::Edited).await?;
        Ok(RowOutcome::Edited)
    }

    async fn delist(&self, row: OfferRow) -> Result<RowOutcome> {
        info!("DELIST flow");
        let offer_id = row
            .offer_id
            .clone()
            .ok_or_else(|| SyncError::Workflow("Must include Offer ID to delist".to_string()))?;

        let token = self.session.bearer_token().await?;
        let offer = self.offers.get_offer(&offer_id, &token).await?;
        if offer.has_status(OfferStatus::Delisted) {
            info!("Offer delisted. No need to change");
            self.write_status(row, StatusNote::DelistedNoChange).await?;
            return Ok(RowOutcome::AlreadyDelisted);
        }

        info!("Change offer status to delist");
        let seller_id = jwt::seller_id(&token)?;
        self.offers
            .bulk_update_status(&seller_id, &offer_id, OfferStatus::Delisted, &token)
            .await?;
        self.write_status(row, StatusNote::Delisted).await?;
        Ok(RowOutcome::Delisted)
    }

    async fn write_status(&self, mut row: OfferRow, note: StatusNote) -> Result<()> {
        let now = now();
        row.note = Some(note.message(now));
        row.timeline = Some(notes::timeline(now));
        self.store.update(&row).await
    }

    /// Put the failure reason in the row's Note cell. A failed write is only logged.
    async fn record_failure(&self, index: u32, err: &SyncError) {
        let now = now();
        let message = match err {
            SyncError::Validation { row, message } => {
                warn!("VALIDATION ERROR AT ROW {}: {}", row, message);
                notes::validation_failure(now, index)
            }
            other => notes::failure(now, &other.to_string()),
        };

        let range = match Column::parse(NOTE_COLUMN) {
            Ok(column) => column.cell(index),
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
        if let Err(e) = self
            .store
            .update_cells(
                &self.sheet_id,
                &self.sheet_name,
                vec![CellWrite::new(range, Some(message))],
            )
            .await
        {
            error!("Could not write failure note for row {}: {}", index, e);
        }
    }
}
