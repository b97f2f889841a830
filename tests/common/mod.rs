//! Shared test doubles for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sgw_sniper::client::{
    BidHistory, BidRecord, ClientError, FavoriteEntry, ItemDetail, Listing, Marketplace,
    QuickBidDetail,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A marketplace that serves canned favorites and item detail and records
/// every bid submission.
pub struct RecordingMarketplace {
    favorites: Mutex<HashMap<i64, FavoriteEntry>>,
    detail: Mutex<ItemDetail>,
    bids: Mutex<Vec<(i64, Decimal, i64)>>,
    fail_bids: AtomicBool,
    detail_calls: AtomicUsize,
}

impl RecordingMarketplace {
    pub fn new() -> Self {
        Self {
            favorites: Mutex::new(HashMap::new()),
            detail: Mutex::new(ItemDetail::default()),
            bids: Mutex::new(Vec::new()),
            fail_bids: AtomicBool::new(false),
            detail_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_favorites(&self, entries: Vec<FavoriteEntry>) {
        *self.favorites.lock().unwrap() = entries.into_iter().map(|e| (e.item_id, e)).collect();
    }

    pub fn set_detail(&self, detail: ItemDetail) {
        *self.detail.lock().unwrap() = detail;
    }

    pub fn fail_bids(&self) {
        self.fail_bids.store(true, Ordering::SeqCst);
    }

    pub fn bids(&self) -> Vec<(i64, Decimal, i64)> {
        self.bids.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

impl Default for RecordingMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Marketplace for RecordingMarketplace {
    async fn favorites(&self) -> Result<HashMap<i64, FavoriteEntry>, ClientError> {
        Ok(self.favorites.lock().unwrap().clone())
    }

    async fn item_detail(&self, _item_id: i64) -> Result<ItemDetail, ClientError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detail.lock().unwrap().clone())
    }

    async fn quick_bid_detail(&self, _item_id: i64) -> Result<QuickBidDetail, ClientError> {
        Ok(QuickBidDetail::default())
    }

    async fn place_bid(
        &self,
        item_id: i64,
        amount: Decimal,
        seller_id: i64,
    ) -> Result<(), ClientError> {
        if self.fail_bids.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 500,
                body: "bid rejected".to_string(),
            });
        }
        self.bids.lock().unwrap().push((item_id, amount, seller_id));
        Ok(())
    }

    async fn add_favorite(&self, _item_id: i64, _note: Option<&str>) -> Result<(), ClientError> {
        Ok(())
    }

    async fn set_favorite_note(&self, _item_id: i64, _note: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn saved_searches(&self) -> Result<Vec<serde_json::Value>, ClientError> {
        Ok(Vec::new())
    }

    async fn search(&self, _query: &serde_json::Value) -> Result<Vec<Listing>, ClientError> {
        Ok(Vec::new())
    }
}

pub fn favorite(item_id: i64, end_time: DateTime<Utc>, note: Option<&str>) -> FavoriteEntry {
    FavoriteEntry {
        item_id,
        title: format!("auction {item_id}"),
        end_time,
        seller_id: 1,
        note: note.map(String::from),
        watchlist_id: 1,
    }
}

pub fn detail(minimum_bid: &str, seller_id: i64, top_bidder: Option<&str>) -> ItemDetail {
    ItemDetail {
        item_id: Some(42),
        title: "Vintage camera".to_string(),
        minimum_bid: Some(Decimal::from_str(minimum_bid).unwrap()),
        current_price: None,
        seller_id: Some(seller_id),
        bid_history: BidHistory {
            bid_summary: top_bidder
                .into_iter()
                .map(|name| BidRecord {
                    bidder_name: name.to_string(),
                })
                .collect(),
        },
    }
}
