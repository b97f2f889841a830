//! Saved-search alerting
//!
//! Stateless transforms between the saved-search objects the marketplace
//! stores and the query objects its search endpoint accepts, plus the
//! listing filters and the seen-listings store that keep repeat runs
//! quiet. The daemon does not use any of this; it backs the `query`
//! subcommand.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::client::{parse_marketplace_timestamp, Listing};
use crate::sniper::parse_offset;

/// Saved-search attributes the query endpoint rejects.
const DROPPED_ATTRS: &[&str] = &[
    "price",
    "sort",
    "categoryName",
    "sellerName",
    "layout",
    "searchOption",
];

/// Saved-search attributes the query endpoint knows under another name.
const RENAMED_ATTRS: &[(&str, &str)] = &[
    ("categoryLevelNum", "categoryLevel"),
    ("isWedding", "isWeddingCategory"),
    ("selectedCategoryIds", "catIds"),
];

/// Everything the search endpoint insists on receiving, whether or not
/// the user cares. Lifted from the web app's requests.
fn query_defaults() -> Value {
    json!({
        "isSize": false,
        "isWeddingCatagory": "false",
        "isMultipleCategoryIds": false,
        "isFromHeaderMenuTab": false,
        "layout": "",
        "searchText": "",
        "selectedGroup": "",
        "selectedCategoryIds": "",
        "selectedSellerIds": "",
        "lowPrice": "0",
        "highPrice": "999999",
        "searchBuyNowOnly": "",
        "searchPickupOnly": "false",
        "searchNoPickupOnly": "false",
        "searchOneCentShippingOnly": "false",
        "searchDescriptions": "false",
        "searchClosedAuctions": "false",
        "closedAuctionEndingDate": "1/1/1",
        "closedAuctionDaysBack": "7",
        "searchCanadaShipping": "false",
        "searchInternationalShippingOnly": "false",
        "sortColumn": "1",
        "page": "1",
        "pageSize": "40",
        "sortDescending": "false",
        "savedSearchId": 0,
        "useBuyerPrefs": "true",
        "searchUSOnlyShipping": "false",
        "categoryLevelNo": "1",
        "categoryLevel": 1,
        "categoryId": 0,
        "partNumber": "",
        "catIds": "",
    })
}

/// Fill in every endpoint-required attribute the user's query omitted.
pub fn apply_query_defaults(query: &mut Value) {
    let Some(obj) = query.as_object_mut() else {
        return;
    };
    let Value::Object(defaults) = query_defaults() else {
        return;
    };
    for (key, value) in defaults {
        obj.entry(key).or_insert(value);
    }
}

/// Contort a saved-search object into a valid query object.
pub fn saved_search_to_query(saved_search: &Value) -> Value {
    let mut obj = saved_search.as_object().cloned().unwrap_or_default();

    for attr in DROPPED_ATTRS {
        obj.remove(*attr);
    }
    for (old, new) in RENAMED_ATTRS {
        if let Some(value) = obj.remove(*old) {
            obj.insert((*new).to_string(), value);
        }
    }

    // The endpoint wants the deepest category id from the comma list.
    let deepest_category = obj
        .get("catIds")
        .and_then(|v| v.as_str())
        .and_then(|s| {
            s.split(',')
                .filter_map(|id| id.trim().parse::<i64>().ok())
                .max()
        });
    if let Some(category_id) = deepest_category {
        obj.insert("selectedCategoryIds".to_string(), json!(category_id));
    }

    // ...and lowercase strings for every value
    let lowered = obj
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, Value::String(text.to_lowercase()))
        })
        .collect();
    Value::Object(lowered)
}

/// Quoted phrases in a search string, e.g. `nikon "prime lens"` yields
/// `["prime lens"]`. Either quote character opens or closes a phrase.
fn extract_quoted_phrases(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut phrases = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\'' || chars[i] == '"' {
            if let Some(offset) = chars[i + 1..]
                .iter()
                .position(|&c| c == '\'' || c == '"')
            {
                let close = i + 1 + offset;
                if close > i + 1 {
                    phrases.push(chars[i + 1..close].iter().collect());
                }
                i = close + 1;
                continue;
            }
        }
        i += 1;
    }
    phrases
}

enum TimeBound {
    Less,
    More,
}

/// Parse a time-remaining filter like `"<2 hours"` or `">30 minutes"`.
fn parse_time_filter(raw: &str) -> Option<(TimeBound, chrono::Duration)> {
    let raw = raw.trim();
    let bound = match raw.chars().next()? {
        '<' => TimeBound::Less,
        '>' => TimeBound::More,
        _ => return None,
    };
    let duration = parse_offset(&raw[1..])?;
    Some((bound, chrono::Duration::from_std(duration).ok()?))
}

/// Apply the query's own constraints to its results: quoted phrases must
/// appear in titles, and an optional time-remaining filter bounds how far
/// from closing a listing may be. Ended listings never pass a `<` filter.
pub fn filter_listings(
    query: &Value,
    listings: Vec<Listing>,
    time_remaining: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Listing> {
    let search_text = query
        .get("searchText")
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_lowercase();
    let quotes = extract_quoted_phrases(&search_text);
    let time_filter = time_remaining.and_then(parse_time_filter);

    listings
        .into_iter()
        .filter(|listing| {
            if let Some((bound, limit)) = &time_filter {
                let remaining = listing
                    .end_time
                    .as_deref()
                    .and_then(|raw| parse_marketplace_timestamp(raw).ok())
                    .map(|end| end - now);
                let Some(remaining) = remaining else {
                    return false;
                };
                let passes = match bound {
                    TimeBound::Less => {
                        remaining > chrono::Duration::zero() && remaining < *limit
                    }
                    TimeBound::More => remaining > *limit,
                };
                if !passes {
                    return false;
                }
            }

            let title = listing.title.to_lowercase();
            quotes.iter().all(|phrase| title.contains(phrase.as_str()))
        })
        .collect()
}

/// Listings already alerted on, keyed by item id with the auction's end
/// time. Ended auctions are pruned so the store never grows unbounded.
#[derive(Debug, Default)]
pub struct SeenListings {
    entries: HashMap<String, DateTime<Utc>>,
}

impl SeenListings {
    /// Load the store; a missing or unreadable file starts fresh.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(entries) => Self { entries },
            Err(e) => {
                tracing::warn!(error = %e, "unreadable seen-listings store, starting fresh");
                Self::default()
            }
        }
    }

    pub fn contains(&self, item_id: i64) -> bool {
        self.entries.contains_key(&item_id.to_string())
    }

    pub fn mark(&mut self, item_id: i64, end_time: DateTime<Utc>) {
        self.entries.insert(item_id.to_string(), end_time);
    }

    /// Drop entries whose auctions have ended.
    pub fn prune_ended(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|_, end_time| *end_time > now);
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listing(item_id: i64, title: &str, end_time: Option<&str>) -> Listing {
        serde_json::from_value(json!({
            "itemId": item_id,
            "title": title,
            "endTime": end_time,
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_fields_only() {
        let mut query = json!({"searchText": "nikon", "lowPrice": "10"});
        apply_query_defaults(&mut query);
        assert_eq!(query["searchText"], "nikon");
        assert_eq!(query["lowPrice"], "10");
        assert_eq!(query["highPrice"], "999999");
        assert_eq!(query["pageSize"], "40");
    }

    #[test]
    fn test_saved_search_transform() {
        let saved = json!({
            "searchText": "NIKON",
            "price": "ignored",
            "sort": "ignored",
            "categoryName": "Cameras",
            "sellerName": "",
            "layout": "grid",
            "searchOption": "",
            "categoryLevelNum": 3,
            "isWedding": false,
            "selectedCategoryIds": "12,112,392",
        });
        let query = saved_search_to_query(&saved);

        for attr in DROPPED_ATTRS {
            assert!(query.get(*attr).is_none(), "{attr} should be dropped");
        }
        assert_eq!(query["categoryLevel"], "3");
        assert_eq!(query["isWeddingCategory"], "false");
        assert_eq!(query["catIds"], "12,112,392");
        assert_eq!(query["selectedCategoryIds"], "392");
        // every value is a lowercased string
        assert_eq!(query["searchText"], "nikon");
    }

    #[test]
    fn test_quoted_phrases() {
        assert_eq!(
            extract_quoted_phrases(r#"nikon "prime lens" 50mm"#),
            vec!["prime lens"]
        );
        assert_eq!(
            extract_quoted_phrases("'first' and 'second'"),
            vec!["first", "second"]
        );
        assert!(extract_quoted_phrases("no quotes here").is_empty());
        assert!(extract_quoted_phrases(r#""""#).is_empty());
    }

    #[test]
    fn test_quote_filter_on_titles() {
        let query = json!({"searchText": "nikon \"prime lens\""});
        let listings = vec![
            listing(1, "Nikon Prime Lens 50mm f/1.8", None),
            listing(2, "Nikon zoom lens", None),
        ];
        let kept = filter_listings(&query, listings, None, Utc::now());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].item_id, 1);
    }

    #[test]
    fn test_time_remaining_filter() {
        // 2025-06-01T18:00:00 Pacific = 2025-06-02T01:00:00Z
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let listings = vec![
            listing(1, "ends in an hour", Some("2025-06-01T18:00:00")),
            listing(2, "ends in a week", Some("2025-06-08T18:00:00")),
            listing(3, "already ended", Some("2025-05-01T18:00:00")),
            listing(4, "no end time", None),
        ];

        let query = json!({"searchText": ""});
        let soon = filter_listings(&query, listings.clone(), Some("<2 hours"), now);
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].item_id, 1);

        let distant = filter_listings(&query, listings, Some(">2 hours"), now);
        assert_eq!(distant.len(), 1);
        assert_eq!(distant[0].item_id, 2);
    }

    #[test]
    fn test_unparseable_time_filter_is_ignored() {
        let query = json!({"searchText": ""});
        let listings = vec![listing(1, "anything", None)];
        let kept = filter_listings(&query, listings, Some("whenever"), Utc::now());
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_seen_listings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let mut seen = SeenListings::load(&path);
        assert!(seen.is_empty());

        let end = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
        seen.mark(42, end);
        assert!(seen.contains(42));
        seen.save(&path).unwrap();

        let reloaded = SeenListings::load(&path);
        assert!(reloaded.contains(42));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_seen_listings_prune() {
        let mut seen = SeenListings::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        seen.mark(1, now - chrono::Duration::hours(1));
        seen.mark(2, now + chrono::Duration::hours(1));

        seen.prune_ended(now);
        assert!(!seen.contains(1));
        assert!(seen.contains(2));
    }

    #[test]
    fn test_seen_listings_bad_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let seen = SeenListings::load(&path);
        assert!(seen.is_empty());
    }
}
