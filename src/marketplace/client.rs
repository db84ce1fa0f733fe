//! Marketplace HTTP client
//!
//! Every call runs under the client's retry policy; non-2xx responses are
//! network failures and get retried like transport errors.

use crate::error::{Result, SyncError};
use crate::marketplace::models::{
    ApiResponse, BulkUpdateRequest, CreateOfferPayload, CreatedOffer, Offer, OfferStatus,
    ResultsPayload,
};
use crate::retry::RetryPolicy;
use crate::taxonomy::model::CollectionNode;
use crate::taxonomy::source::{TaxonomyQuery, TaxonomySource};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, info};

/// Offer lifecycle calls. Authenticated with the session token.
#[async_trait]
pub trait OfferApi: Send + Sync {
    async fn create_offer(&self, payload: &CreateOfferPayload, token: &str) -> Result<CreatedOffer>;

    async fn get_offer(&self, offer_id: &str, token: &str) -> Result<Offer>;

    async fn update_offer(
        &self,
        offer_id: &str,
        payload: &CreateOfferPayload,
        token: &str,
    ) -> Result<CreatedOffer>;

    async fn bulk_update_status(
        &self,
        seller_id: &str,
        offer_id: &str,
        status: OfferStatus,
        token: &str,
    ) -> Result<()>;
}

pub struct MarketplaceClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl MarketplaceClient {
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send the request built by `build`, retrying on network failures, and
    /// decode the JSON body.
    async fn send_json<T, F>(&self, what: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.retry
            .run(what, || {
                let request = build();
                async move {
                    let response = check(request.send().await?).await?;
                    let body = response.text().await?;
                    serde_json::from_str::<T>(&body).map_err(SyncError::from)
                }
            })
            .await
    }

    async fn send_empty<F>(&self, what: &str, build: F) -> Result<()>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.retry
            .run(what, || {
                let request = build();
                async move {
                    check(request.send().await?).await?;
                    Ok(())
                }
            })
            .await
    }

    /// Top-level collections for a category.
    pub async fn get_collections(&self, query: &TaxonomyQuery) -> Result<Vec<CollectionNode>> {
        let mut params: Vec<(&str, String)> = vec![
            ("include_searchable_only", "0".to_string()),
            ("service_id", query.service_id.clone()),
            ("brand_id", query.brand_id.clone()),
        ];
        if let Some(region) = &query.region_id {
            params.push(("region_id", region.clone()));
        }
        let url = self.url("/offer/keyword_relation/collection/");

        let response: ApiResponse<ResultsPayload<CollectionNode>> = self
            .send_json("get collections", || self.client.get(&url).query(&params))
            .await?;
        Ok(response.payload.results)
    }

    /// Collections by id, used for dependent collections.
    pub async fn attributes_search(&self, collection_ids: &[String]) -> Result<Vec<CollectionNode>> {
        let url = self.url("/offer/keyword_relation/attributes/search");
        let body = json!({ "collection_ids": collection_ids });

        let response: ApiResponse<ResultsPayload<CollectionNode>> = self
            .send_json("attributes search", || self.client.post(&url).json(&body))
            .await?;
        Ok(response.payload.results)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    error!("{} returned {}: {}", url, status, body);
    Err(SyncError::Network(format!("{} returned {}: {}", url, status, body)))
}

#[async_trait]
impl TaxonomySource for MarketplaceClient {
    async fn fetch_collections(&self, query: &TaxonomyQuery) -> Result<Vec<CollectionNode>> {
        self.get_collections(query).await
    }

    async fn fetch_dependent_collections(
        &self,
        collection_ids: &[String],
    ) -> Result<Vec<CollectionNode>> {
        self.attributes_search(collection_ids).await
    }
}

#[async_trait]
impl OfferApi for MarketplaceClient {
    async fn create_offer(&self, payload: &CreateOfferPayload, token: &str) -> Result<CreatedOffer> {
        let url = self.url("/offer");
        let response: ApiResponse<CreatedOffer> = self
            .send_json("create offer", || {
                self.client
                    .post(&url)
                    .header("authorization", token)
                    .json(payload)
            })
            .await?;
        info!("Created offer {}", response.payload.offer_id);
        Ok(response.payload)
    }

    async fn get_offer(&self, offer_id: &str, token: &str) -> Result<Offer> {
        let url = self.url(&format!("/offer/{}", offer_id));
        let response: ApiResponse<Offer> = self
            .send_json("get offer", || {
                self.client
                    .get(&url)
                    .query(&[("include_out_of_stock", "1"), ("include_inactive", "1")])
                    .header("authorization", token)
            })
            .await?;
        Ok(response.payload)
    }

    async fn update_offer(
        &self,
        offer_id: &str,
        payload: &CreateOfferPayload,
        token: &str,
    ) -> Result<CreatedOffer> {
        let url = self.url(&format!("/offer/{}", offer_id));
        let response: ApiResponse<CreatedOffer> = self
            .send_json("update offer", || {
                self.client
                    .put(&url)
                    .header("authorization", token)
                    .json(payload)
            })
            .await?;
        Ok(response.payload)
    }

    async fn bulk_update_status(
        &self,
        seller_id: &str,
        offer_id: &str,
        status: OfferStatus,
        token: &str,
    ) -> Result<()> {
        let url = self.url(&format!("/offer/seller/{}/bulk_update", seller_id));
        let body = BulkUpdateRequest {
            offer_ids: vec![offer_id.to_string()],
            status,
        };
        self.send_empty("bulk update", || {
            self.client
                .put(&url)
                .header("authorization", token)
                .json(&body)
        })
        .await?;
        info!("Offer {} set to {}", offer_id, status.as_str());
        Ok(())
    }
}
