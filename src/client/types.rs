//! Wire types for the ShopGoodwill buyer API
//!
//! The API is loose with types: numeric ids arrive as numbers or strings
//! depending on the endpoint, `data` arrays may be JSON null, and end-time
//! timestamps are bare local-time strings with inconsistent fractional
//! seconds. Everything here normalizes at ingestion so the rest of the
//! crate only sees clean domain values.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::ClientError;

/// A tracked auction from the user's favorites list.
///
/// End times are UTC; the raw feed reports them in the marketplace's
/// regional zone (see [`parse_marketplace_timestamp`]).
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteEntry {
    pub item_id: i64,
    pub title: String,
    pub end_time: DateTime<Utc>,
    pub seller_id: i64,
    pub note: Option<String>,
    pub watchlist_id: i64,
}

/// Favorites as serialized by `Favorite/GetAllFavoriteItemsByType`.
#[derive(Debug, Deserialize)]
pub(crate) struct FavoritesResponse {
    /// The API returns null instead of an empty array when there are no
    /// favorites.
    pub data: Option<Vec<RawFavorite>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFavorite {
    #[serde(deserialize_with = "de_i64")]
    pub item_id: i64,
    #[serde(default)]
    pub title: String,
    pub end_time: String,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub watchlist_id: Option<i64>,
}

impl TryFrom<RawFavorite> for FavoriteEntry {
    type Error = ClientError;

    fn try_from(raw: RawFavorite) -> Result<Self, ClientError> {
        let end_time = parse_marketplace_timestamp(&raw.end_time)?;
        // Empty notes and absent notes are the same thing to the sniper.
        let note = raw.notes.filter(|n| !n.trim().is_empty());
        Ok(FavoriteEntry {
            item_id: raw.item_id,
            title: raw.title,
            end_time,
            seller_id: raw.seller_id.unwrap_or(0),
            note,
            watchlist_id: raw.watchlist_id.unwrap_or(0),
        })
    }
}

/// Full item detail from `itemDetail/GetItemDetailModelByItemId`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub minimum_bid: Option<Decimal>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub bid_history: BidHistory,
}

impl ItemDetail {
    /// The smallest amount a new bid must reach to be accepted.
    pub fn min_acceptable_bid(&self) -> Option<Decimal> {
        self.minimum_bid.or(self.current_price)
    }

    /// Name of the current high bidder, if there are any bids.
    pub fn top_bidder(&self) -> Option<&str> {
        self.bid_history
            .bid_summary
            .first()
            .map(|b| b.bidder_name.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidHistory {
    #[serde(default)]
    pub bid_summary: Vec<BidRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRecord {
    #[serde(default)]
    pub bidder_name: String,
}

/// Quick-bid detail from `itemBid/ShowBidModal`.
///
/// Much cheaper than the full item detail; carries the seller ID and the
/// current price but little else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickBidDetail {
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "de_opt_i64")]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub minimum_bid: Option<Decimal>,
}

/// A search result from `Search/ItemListing`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(deserialize_with = "de_i64")]
    pub item_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub minimum_bid: Option<Decimal>,
    #[serde(default)]
    pub buy_now_price: Option<Decimal>,
    #[serde(default)]
    pub discounted_buy_now_price: Option<Decimal>,
    #[serde(default)]
    pub remaining_time: Option<String>,
}

impl Listing {
    /// Public listing page for this item.
    pub fn url(&self) -> String {
        format!("https://shopgoodwill.com/item/{}", self.item_id)
    }
}

/// Normalize a marketplace end-time string to UTC.
///
/// Timestamps arrive as `2025-05-01T22:09:00` or `2025-04-29T23:00:17.45`
/// in the marketplace's regional zone (US Pacific) with the zone suffix
/// trimmed off. Fractional seconds are truncated, never rounded.
pub fn parse_marketplace_timestamp(raw: &str) -> Result<DateTime<Utc>, ClientError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.split('.').next().unwrap_or(trimmed);
    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| ClientError::Malformed(format!("bad timestamp '{raw}': {e}")))?;
    let local = match Los_Angeles.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        // DST fall-back repeats an hour; take the earlier reading.
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            return Err(ClientError::Malformed(format!(
                "timestamp '{raw}' does not exist in the marketplace time zone"
            )))
        }
    };
    Ok(local.with_timezone(&Utc))
}

/// Deserialize an id that the API serializes as either a number or a
/// string.
fn de_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Int(i) => Ok(i),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }
    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(i)) => Ok(Some(i)),
        Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_timestamp_normalized_to_utc() {
        // June is PDT (UTC-7)
        let dt = parse_marketplace_timestamp("2025-06-01T18:00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-02T01:00:00+00:00");
    }

    #[test]
    fn test_timestamp_standard_time() {
        // January is PST (UTC-8)
        let dt = parse_marketplace_timestamp("2025-01-15T10:00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-15T18:00:00+00:00");
    }

    #[test]
    fn test_timestamp_fractional_seconds_truncated() {
        let dt = parse_marketplace_timestamp("2025-04-29T23:00:17.45").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-04-30T06:00:17+00:00");
    }

    #[test]
    fn test_timestamp_garbage_rejected() {
        assert!(parse_marketplace_timestamp("not a timestamp").is_err());
        assert!(parse_marketplace_timestamp("").is_err());
    }

    #[test]
    fn test_favorite_conversion() {
        let raw: RawFavorite = serde_json::from_str(
            r#"{
                "itemId": "12345",
                "title": "Vintage camera",
                "endTime": "2025-06-01T18:00:00",
                "sellerId": 999,
                "notes": "{\"max_bid\": 50}",
                "watchlistId": 777
            }"#,
        )
        .unwrap();
        let entry = FavoriteEntry::try_from(raw).unwrap();
        assert_eq!(entry.item_id, 12345);
        assert_eq!(entry.seller_id, 999);
        assert_eq!(entry.watchlist_id, 777);
        assert_eq!(entry.note.as_deref(), Some("{\"max_bid\": 50}"));
    }

    #[test]
    fn test_favorite_blank_note_dropped() {
        let raw: RawFavorite = serde_json::from_str(
            r#"{"itemId": 1, "endTime": "2025-06-01T18:00:00", "notes": "  "}"#,
        )
        .unwrap();
        let entry = FavoriteEntry::try_from(raw).unwrap();
        assert!(entry.note.is_none());
    }

    #[test]
    fn test_favorite_bad_end_time_rejected() {
        let raw: RawFavorite =
            serde_json::from_str(r#"{"itemId": 1, "endTime": "tomorrow"}"#).unwrap();
        assert!(FavoriteEntry::try_from(raw).is_err());
    }

    #[test]
    fn test_favorites_response_null_data() {
        let resp: FavoritesResponse = serde_json::from_str(r#"{"data": null}"#).unwrap();
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_item_detail_min_acceptable_bid() {
        let detail: ItemDetail = serde_json::from_str(
            r#"{"itemId": 42, "title": "Lamp", "minimumBid": 15.00, "currentPrice": 12.00}"#,
        )
        .unwrap();
        assert_eq!(detail.min_acceptable_bid(), Some(dec!(15.00)));

        let detail: ItemDetail =
            serde_json::from_str(r#"{"itemId": 42, "currentPrice": "12.00"}"#).unwrap();
        assert_eq!(detail.min_acceptable_bid(), Some(dec!(12.00)));
    }

    #[test]
    fn test_item_detail_top_bidder() {
        let detail: ItemDetail = serde_json::from_str(
            r#"{
                "itemId": 42,
                "bidHistory": {"bidSummary": [
                    {"bidderName": "alice"},
                    {"bidderName": "bob"}
                ]}
            }"#,
        )
        .unwrap();
        assert_eq!(detail.top_bidder(), Some("alice"));

        let empty = ItemDetail::default();
        assert!(empty.top_bidder().is_none());
    }

    #[test]
    fn test_listing_url() {
        let listing: Listing =
            serde_json::from_str(r#"{"itemId": 42, "title": "Lamp"}"#).unwrap();
        assert_eq!(listing.url(), "https://shopgoodwill.com/item/42");
    }
}
