//! Marketplace client module
//!
//! ShopGoodwill buyer-API access behind the [`Marketplace`] trait. The
//! scheduler and the action executor only ever see the trait, which keeps
//! the money-moving paths testable against a mock. Every HTTP response
//! funnels through one instrumented call site in [`SgwClient`] that feeds
//! the outage tracker.

mod crypto;
mod shopgoodwill;
mod types;

pub use crypto::encrypt_credential;
pub use shopgoodwill::{SgwClient, SgwConfig};
pub use types::{
    parse_marketplace_timestamp, BidHistory, BidRecord, FavoriteEntry, ItemDetail, Listing,
    QuickBidDetail,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Marketplace operation errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a non-success status
    #[error("marketplace returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The request never completed (connect, timeout, decode)
    #[error("marketplace request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Login or token validation failed
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The service answered 2xx but the body made no sense
    #[error("malformed marketplace response: {0}")]
    Malformed(String),
    /// A favorites mutation referenced an item that is not favorited
    #[error("item {0} is not in the favorites list")]
    NotFavorited(i64),
}

impl ClientError {
    /// Server-side failures that an outage, not a caller, explains.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (500..600).contains(status))
    }
}

/// The marketplace operations the sniper needs.
#[async_trait]
pub trait Marketplace: Send + Sync {
    /// The user's open favorites, keyed by item id.
    async fn favorites(&self) -> Result<HashMap<i64, FavoriteEntry>, ClientError>;

    /// Full detail for one item (minimum bid, seller, bid history).
    async fn item_detail(&self, item_id: i64) -> Result<ItemDetail, ClientError>;

    /// The quick-bid subset of item detail; much cheaper.
    async fn quick_bid_detail(&self, item_id: i64) -> Result<QuickBidDetail, ClientError>;

    /// Submit a bid. Quantity is always 1; the marketplace ignores it for
    /// auctions.
    async fn place_bid(
        &self,
        item_id: i64,
        amount: Decimal,
        seller_id: i64,
    ) -> Result<(), ClientError>;

    /// Add an item to favorites, optionally attaching a note. Idempotent
    /// for already-favorited items.
    async fn add_favorite(&self, item_id: i64, note: Option<&str>) -> Result<(), ClientError>;

    /// Replace the note on an already-favorited item.
    async fn set_favorite_note(&self, item_id: i64, note: &str) -> Result<(), ClientError>;

    /// The user's saved searches, as raw API objects.
    async fn saved_searches(&self) -> Result<Vec<serde_json::Value>, ClientError>;

    /// Run a listing query, walking every result page.
    async fn search(&self, query: &serde_json::Value) -> Result<Vec<Listing>, ClientError>;
}
