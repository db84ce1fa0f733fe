//! Marketplace API: wire models, token claims, and the HTTP client.

pub mod client;
pub mod jwt;
pub mod models;

pub use client::{MarketplaceClient, OfferApi};
pub use models::{CreateOfferPayload, ListingQuery, Offer, OfferStatus};
