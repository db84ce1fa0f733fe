//! Offer Payload Assembler: row fields + resolved attributes + seller id.

use crate::error::Result;
use crate::marketplace::jwt;
use crate::marketplace::models::{
    CreateOfferPayload, DeliverySpeedDetail, ExternalImageMapping, ListingQuery,
    SalesTerritorySettings,
};
use crate::sheet::offer::OfferRow;
use crate::taxonomy::resolver::{AttributeResolver, ResolvedAttribute};
use crate::taxonomy::source::TaxonomySource;

pub fn assemble(
    row: &OfferRow,
    seller_id: &str,
    listing: &ListingQuery,
    attributes: Vec<ResolvedAttribute>,
) -> CreateOfferPayload {
    CreateOfferPayload {
        seller_id: seller_id.to_string(),
        delivery_method_ids: Vec::new(),
        delivery_speed: "manual".to_string(),
        delivery_speed_details: vec![DeliverySpeedDetail {
            min: row.delivery_speed_min,
            max: row.delivery_speed_max,
            delivery_time: row.delivery_time,
        }],
        qty: row.stock,
        description: row.description.clone(),
        currency: row.currency.clone(),
        min_qty: row.minimum_purchase_quantity,
        low_stock_alert_qty: 0,
        sales_territory_settings: SalesTerritorySettings::default(),
        title: row.title.clone(),
        offer_attributes: attributes,
        external_images_mapping: row
            .media_gallery
            .as_deref()
            .map(ExternalImageMapping::parse_gallery)
            .unwrap_or_default(),
        unit_price: row.unit_price,
        other_pricing: Vec::new(),
        wholesale_details: Vec::new(),
        other_wholesale_details: Vec::new(),
        service_id: listing.service_id.clone(),
        brand_id: listing.brand_id.clone(),
        region_id: listing.region_id.clone(),
        offer_type: "public".to_string(),
    }
}

/// Resolve the row's attributes against a fresh taxonomy and build the
/// create/update payload.
pub async fn prepare_payload(
    row: &OfferRow,
    token: &str,
    taxonomy: &dyn TaxonomySource,
) -> Result<CreateOfferPayload> {
    let seller_id = jwt::seller_id(token)?;
    let listing = ListingQuery::from_url(&row.create_offer_link)?;
    let attributes = AttributeResolver::new(taxonomy)
        .resolve_for(&listing.taxonomy_query(), &row.attribute_inputs())
        .await?;
    Ok(assemble(row, &seller_id, &listing, attributes))
}
