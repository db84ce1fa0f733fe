use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use offer_sheet_sync::marketplace::models::CreatedOffer;
use offer_sheet_sync::marketplace::{CreateOfferPayload, Offer, OfferApi, OfferStatus};
use offer_sheet_sync::retry::RetryPolicy;
use offer_sheet_sync::session::StaticTokenProvider;
use offer_sheet_sync::sheet::{MemorySheet, RecordStore};
use offer_sheet_sync::taxonomy::{CollectionNode, StaticTaxonomy};
use offer_sheet_sync::workflow::{self, OfferSync};
use offer_sheet_sync::{Result, SyncError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

const SHEET_ID: &str = "sheet-1";
const SHEET_NAME: &str = "Offers";
const LISTING_URL: &str = "https://www.g2g.com/offers/create?service_id=svc-1&brand_id=brand-1&root_id=root-1&cat_id=cat-1&cat_path=path-1&relation_id=rel-1";

/// Marketplace double: offers keyed by id, plus a log of writes.
#[derive(Default)]
struct FakeMarketplace {
    statuses: Mutex<HashMap<String, String>>,
    created: Mutex<Vec<CreateOfferPayload>>,
    updated: Mutex<Vec<String>>,
    status_changes: Mutex<Vec<(String, String, OfferStatus)>>,
}

impl FakeMarketplace {
    fn with_offer(self, offer_id: &str, status: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(offer_id.to_string(), status.to_string());
        self
    }
}

#[async_trait]
impl OfferApi for FakeMarketplace {
    async fn create_offer(&self, payload: &CreateOfferPayload, _token: &str) -> Result<CreatedOffer> {
        let mut created = self.created.lock().unwrap();
        created.push(payload.clone());
        Ok(CreatedOffer {
            offer_id: format!("G{}", 1000 + created.len()),
            seller_id: payload.seller_id.clone(),
            status: "live".to_string(),
            title: payload.title.clone(),
            offer_attributes: payload.offer_attributes.clone(),
        })
    }

    async fn get_offer(&self, offer_id: &str, _token: &str) -> Result<Offer> {
        let statuses = self.statuses.lock().unwrap();
        let status = statuses
            .get(offer_id)
            .cloned()
            .ok_or_else(|| SyncError::Network(format!("404 offer {} not found", offer_id)))?;
        Ok(Offer {
            offer_id: offer_id.to_string(),
            status,
            title: String::new(),
            seller_id: String::new(),
            offer_attributes: Vec::new(),
            delisted_reason: String::new(),
        })
    }

    async fn update_offer(
        &self,
        offer_id: &str,
        payload: &CreateOfferPayload,
        _token: &str,
    ) -> Result<CreatedOffer> {
        self.updated.lock().unwrap().push(offer_id.to_string());
        Ok(CreatedOffer {
            offer_id: offer_id.to_string(),
            seller_id: payload.seller_id.clone(),
            status: "live".to_string(),
            title: payload.title.clone(),
            offer_attributes: payload.offer_attributes.clone(),
        })
    }

    async fn bulk_update_status(
        &self,
        seller_id: &str,
        offer_id: &str,
        status: OfferStatus,
        _token: &str,
    ) -> Result<()> {
        self.status_changes
            .lock()
            .unwrap()
            .push((seller_id.to_string(), offer_id.to_string(), status));
        self.statuses
            .lock()
            .unwrap()
            .insert(offer_id.to_string(), status.as_str().to_string());
        Ok(())
    }
}

fn token() -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(r#"{"sub":"seller-9","exp":1900000000}"#)
    )
}

fn collection(value: serde_json::Value) -> CollectionNode {
    serde_json::from_value(value).unwrap()
}

/// Platform (Console unlocks a console-type collection), then Region.
fn taxonomy() -> StaticTaxonomy {
    StaticTaxonomy::new(vec![
        collection(json!({
            "collection_id": "c-region",
            "value": "Region",
            "sort_order": 2,
            "children": [
                {"collection_id": "c-region", "dataset_id": "d-eu", "value": "EU"},
                {"collection_id": "c-region", "dataset_id": "d-us", "value": "US"}
            ]
        })),
        collection(json!({
            "collection_id": "c-platform",
            "value": "Platform",
            "sort_order": 1,
            "input_field": "dropdown",
            "children": [
                {"collection_id": "c-platform", "dataset_id": "d-pc", "value": "PC"},
                {
                    "collection_id": "c-platform",
                    "dataset_id": "d-console",
                    "value": "Console",
                    "dpd_collections": [{"collection_id": "c-console-type", "sort_order": 1}]
                }
            ]
        })),
    ])
    .with_dependent(collection(json!({
        "collection_id": "c-console-type",
        "value": "Console type",
        "children": [
            {"collection_id": "c-console-type", "dataset_id": "d-ps5", "value": "PS5"},
            {"collection_id": "c-console-type", "dataset_id": "d-xbox", "value": "Xbox"}
        ]
    })))
}

fn seed_row(sheet: &MemorySheet, row: u32, check: &str, offer_id: Option<&str>, attributes: &[&str]) {
    let cells = [
        ("B", check),
        ("H", LISTING_URL),
        ("I", "Gold 1000"),
        ("J", "Fast delivery"),
        ("L", "USD"),
        ("M", "12.5"),
        ("N", "Face to face"),
        ("O", "100"),
        ("P", "1"),
        ("Q", "1"),
        ("R", "3"),
        ("S", "2"),
        ("T", "Global"),
    ];
    for (column, value) in cells {
        sheet.set(SHEET_ID, SHEET_NAME, &format!("{}{}", column, row), value);
    }
    if let Some(id) = offer_id {
        sheet.set(SHEET_ID, SHEET_NAME, &format!("E{}", row), id);
    }
    for (column, value) in ["U", "V", "W", "X"].iter().zip(attributes) {
        sheet.set(SHEET_ID, SHEET_NAME, &format!("{}{}", column, row), value);
    }
}

fn sync(sheet: &MemorySheet, market: Arc<FakeMarketplace>) -> OfferSync<MemorySheet> {
    sheet.set(SHEET_ID, SHEET_NAME, "B1", "Check");
    OfferSync::new(
        RecordStore::new(sheet.clone(), RetryPolicy::none()),
        market,
        Arc::new(taxonomy()),
        Arc::new(StaticTokenProvider::new(token()).unwrap()),
        SHEET_ID,
        SHEET_NAME,
    )
}

fn note(sheet: &MemorySheet, row: u32) -> String {
    sheet
        .value(SHEET_ID, SHEET_NAME, &format!("C{}", row))
        .unwrap_or_default()
}

#[tokio::test]
async fn test_list_without_offer_id_creates_offer() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", None, &["pc", " eu "]);
    let market = Arc::new(FakeMarketplace::default());
    let sync = sync(&sheet, market.clone());

    let summary = sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(!summary.interrupted);

    assert_eq!(sheet.value(SHEET_ID, SHEET_NAME, "E2").as_deref(), Some("G1001"));
    assert!(note(&sheet, 2).ends_with(": Offer created"));
    assert!(sheet.value(SHEET_ID, SHEET_NAME, "D2").is_some());

    let created = market.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].seller_id, "seller-9");
    assert_eq!(created[0].region_id, None);
    let ids: Vec<&str> = created[0]
        .offer_attributes
        .iter()
        .map(|a| a.dataset_id.as_str())
        .collect();
    assert_eq!(ids, vec!["d-pc", "d-eu"]);
}

#[tokio::test]
async fn test_list_relists_offer_that_is_not_live() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", Some("G77"), &["PC", "EU"]);
    let market = Arc::new(FakeMarketplace::default().with_offer("G77", "delisted"));
    let sync = sync(&sheet, market.clone());

    sync.run_pass(&AtomicBool::new(false)).await.unwrap();

    let changes = market.status_changes.lock().unwrap();
    assert_eq!(
        *changes,
        vec![("seller-9".to_string(), "G77".to_string(), OfferStatus::Live)]
    );
    assert!(note(&sheet, 2).ends_with(": Offer listed"));
    assert!(market.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_live_offer_is_left_alone() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", Some("G77"), &["PC", "EU"]);
    let market = Arc::new(FakeMarketplace::default().with_offer("G77", "live"));
    let sync = sync(&sheet, market.clone());

    let outcome = sync.process_index(2).await.unwrap();
    assert_eq!(outcome, offer_sheet_sync::RowOutcome::AlreadyListed);
    assert!(market.status_changes.lock().unwrap().is_empty());
    assert!(note(&sheet, 2).ends_with("Offer already listed, no change needed"));
}

#[tokio::test]
async fn test_delist_of_delisted_offer_writes_no_change_note() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 4, "DELIST", Some("G5"), &[]);
    let market = Arc::new(FakeMarketplace::default().with_offer("G5", "delisted"));
    let sync = sync(&sheet, market.clone());

    let summary = sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(market.status_changes.lock().unwrap().is_empty());
    assert!(note(&sheet, 4).ends_with("Offer already delisted, no change needed"));
}

#[tokio::test]
async fn test_delist_live_offer() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "DELIST", Some("G5"), &[]);
    let market = Arc::new(FakeMarketplace::default().with_offer("G5", "live"));
    let sync = sync(&sheet, market.clone());

    sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(
        market.status_changes.lock().unwrap()[0].2,
        OfferStatus::Delisted
    );
    assert!(note(&sheet, 2).ends_with(": Offer delisted"));
}

#[tokio::test]
async fn test_edit_updates_offer() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "EDIT", Some("G5"), &["Console", "PS5", "US"]);
    let market = Arc::new(FakeMarketplace::default().with_offer("G5", "live"));
    let sync = sync(&sheet, market.clone());

    sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(*market.updated.lock().unwrap(), vec!["G5".to_string()]);
    assert!(note(&sheet, 2).ends_with(": Offer updated"));
}

#[tokio::test]
async fn test_failed_row_gets_note_and_pass_continues() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "EDIT", None, &["PC", "EU"]);
    seed_row(&sheet, 3, "LIST", None, &["PC", "EU"]);
    let market = Arc::new(FakeMarketplace::default());
    let sync = sync(&sheet, market.clone());

    let summary = sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    let failure = note(&sheet, 2);
    assert!(failure.contains("FAILED:"));
    assert!(failure.contains("Must include Offer ID to edit"));
    assert_eq!(sheet.value(SHEET_ID, SHEET_NAME, "E3").as_deref(), Some("G1001"));
}

#[tokio::test]
async fn test_validation_error_note() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", None, &["PC", "EU"]);
    sheet.set(SHEET_ID, SHEET_NAME, "O2", "lots");
    let market = Arc::new(FakeMarketplace::default());
    let sync = sync(&sheet, market.clone());

    let summary = sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert!(note(&sheet, 2).ends_with("VALIDATION ERROR AT ROW: 2"));
    assert!(market.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_attribute_value_is_reported() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", None, &["Switch", "EU"]);
    let market = Arc::new(FakeMarketplace::default());
    let sync = sync(&sheet, market.clone());

    sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    let failure = note(&sheet, 2);
    assert!(failure.contains("FAILED: Attribute Platform only accepts"));
    assert!(failure.contains("Switch"));
    assert!(market.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_flag_interrupts_pass() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", None, &["PC", "EU"]);
    let market = Arc::new(FakeMarketplace::default());
    let sync = sync(&sheet, market.clone());

    let summary = sync.run_pass(&AtomicBool::new(true)).await.unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.processed, 0);
    assert_eq!(sheet.write_calls(), 0);
}

#[tokio::test]
async fn test_resolve_row_expands_dependent_collection() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 6, "LIST", None, &["Console", "Xbox", "US"]);
    let store = RecordStore::new(sheet.clone(), RetryPolicy::none());

    let resolved = workflow::resolve_row(&store, SHEET_ID, SHEET_NAME, 6, &taxonomy())
        .await
        .unwrap();
    let pairs: Vec<(&str, &str)> = resolved
        .iter()
        .map(|a| (a.collection_id.as_str(), a.dataset_id.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("c-platform", "d-console"),
            ("c-console-type", "d-xbox"),
            ("c-region", "d-us"),
        ]
    );
    assert_eq!(sheet.write_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_relax_fails_only_that_row() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", None, &["PC", "EU"]);
    sheet.set(SHEET_ID, SHEET_NAME, "AE2", "1e300");
    seed_row(&sheet, 3, "LIST", None, &["PC", "EU"]);
    let market = Arc::new(FakeMarketplace::default());
    let sync = sync(&sheet, market.clone());

    let summary = sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    assert!(note(&sheet, 2).ends_with("VALIDATION ERROR AT ROW: 2"));
    assert_eq!(sheet.value(SHEET_ID, SHEET_NAME, "E2"), None);
    assert_eq!(sheet.value(SHEET_ID, SHEET_NAME, "E3").as_deref(), Some("G1001"));
    assert_eq!(market.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_write_keeps_number_formatting() {
    let sheet = MemorySheet::new();
    seed_row(&sheet, 2, "LIST", Some("G77"), &["PC", "EU"]);
    sheet.set(SHEET_ID, SHEET_NAME, "M2", "12.50");
    sheet.set(SHEET_ID, SHEET_NAME, "O2", "1,000");
    let market = Arc::new(FakeMarketplace::default().with_offer("G77", "live"));
    let sync = sync(&sheet, market);

    sync.run_pass(&AtomicBool::new(false)).await.unwrap();
    assert!(note(&sheet, 2).ends_with("Offer already listed, no change needed"));
    assert_eq!(sheet.value(SHEET_ID, SHEET_NAME, "M2").as_deref(), Some("12.50"));
    assert_eq!(sheet.value(SHEET_ID, SHEET_NAME, "O2").as_deref(), Some("1,000"));
}
