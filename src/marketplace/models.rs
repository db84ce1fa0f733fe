use crate::error::{Result, SyncError};
use crate::taxonomy::resolver::ResolvedAttribute;
use crate::taxonomy::source::TaxonomyQuery;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// `(name)(url)` at the start of a gallery line
    static ref GALLERY_ENTRY: Regex = Regex::new(r"^\(([^)]*)\)\(([^)]*)\)").unwrap();
}

/// Response envelope shared by every marketplace endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub messages: Vec<String>,
    pub payload: T,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsPayload<T> {
    pub results: Vec<T>,
}

/// Query parameters of a "create offer" listing URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub service_id: String,
    pub brand_id: String,
    pub root_id: String,
    pub cat_id: String,
    pub cat_path: String,
    pub relation_id: String,
    pub region_id: Option<String>,
}

impl ListingQuery {
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| SyncError::Workflow(format!("Invalid listing URL '{}': {}", url, e)))?;

        let param = |name: &str| -> Option<String> {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| -> Result<String> {
            param(name).ok_or_else(|| {
                SyncError::Workflow(format!("Listing URL is missing query parameter '{}'", name))
            })
        };

        Ok(Self {
            service_id: required("service_id")?,
            brand_id: required("brand_id")?,
            root_id: required("root_id")?,
            cat_id: required("cat_id")?,
            cat_path: required("cat_path")?,
            relation_id: required("relation_id")?,
            region_id: param("region_id"),
        })
    }

    pub fn taxonomy_query(&self) -> TaxonomyQuery {
        TaxonomyQuery {
            service_id: self.service_id.clone(),
            brand_id: self.brand_id.clone(),
            region_id: self.region_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalImageMapping {
    pub image_name: String,
    pub image_url: String,
}

impl ExternalImageMapping {
    /// One `(name)(url)` entry per line; other lines are skipped.
    pub fn parse_gallery(text: &str) -> Vec<Self> {
        text.lines()
            .filter_map(|line| GALLERY_ENTRY.captures(line))
            .map(|caps| Self {
                image_name: caps[1].to_string(),
                image_url: caps[2].to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySpeedDetail {
    pub min: i64,
    pub max: i64,
    pub delivery_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTerritorySettings {
    pub settings_type: String,
    #[serde(default)]
    pub countries: Vec<String>,
}

impl Default for SalesTerritorySettings {
    fn default() -> Self {
        Self {
            settings_type: "global".to_string(),
            countries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOfferPayload {
    pub seller_id: String,
    pub delivery_method_ids: Vec<String>,
    pub delivery_speed: String,
    pub delivery_speed_details: Vec<DeliverySpeedDetail>,
    pub qty: i64,
    pub description: String,
    pub currency: String,
    pub min_qty: i64,
    pub low_stock_alert_qty: i64,
    pub sales_territory_settings: SalesTerritorySettings,
    pub title: String,
    pub offer_attributes: Vec<ResolvedAttribute>,
    pub external_images_mapping: Vec<ExternalImageMapping>,
    pub unit_price: f64,
    pub other_pricing: Vec<serde_json::Value>,
    pub wholesale_details: Vec<serde_json::Value>,
    pub other_wholesale_details: Vec<serde_json::Value>,
    pub service_id: String,
    pub brand_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    pub offer_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    #[serde(rename = "live")]
    Live,
    #[serde(rename = "delisted")]
    Delisted,
    #[serde(rename = "delisted_by_g2g")]
    DelistedByMarketplace,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Live => "live",
            OfferStatus::Delisted => "delisted",
            OfferStatus::DelistedByMarketplace => "delisted_by_g2g",
        }
    }
}

/// Offer as returned by create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOffer {
    pub offer_id: String,
    #[serde(default)]
    pub seller_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub offer_attributes: Vec<ResolvedAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferValue {
    pub collection_id: String,
    pub dataset_id: String,
    #[serde(default)]
    pub value: String,
}

/// Offer as returned by the detail endpoint. Only the fields the sync reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: String,
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub seller_id: String,
    #[serde(default)]
    pub offer_attributes: Vec<OfferValue>,
    #[serde(default)]
    pub delisted_reason: String,
}

impl Offer {
    pub fn has_status(&self, status: OfferStatus) -> bool {
        self.status == status.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateRequest {
    pub offer_ids: Vec<String>,
    pub status: OfferStatus,
}
