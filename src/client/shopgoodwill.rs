//! ShopGoodwill buyer-API client
//!
//! Speaks the same API the web app does, spoofed User-Agent included (the
//! default reqwest UA is rejected outright). Authentication is a bearer
//! token, validated by a cheap probe call, with username/password login as
//! the fallback. The login endpoint only works after the signin page has
//! handed out its cookies, hence the cookie jar.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::Credentials;
use crate::outage::StatusObservation;

use super::crypto::encrypt_credential;
use super::types::{FavoritesResponse, Listing, QuickBidDetail};
use super::{ClientError, FavoriteEntry, ItemDetail, Marketplace};
use async_trait::async_trait;

/// Buyer API base URL
pub const API_ROOT: &str = "https://buyerapi.shopgoodwill.com/api";
/// The signin page that seeds the session cookies
pub const LOGIN_PAGE_URL: &str = "https://shopgoodwill.com/signin";

/// The marketplace blocks the default client UA
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:12.0) Gecko/20100101 Firefox/12.0";

/// Notes longer than this are truncated server-side anyway
const MAX_NOTE_LENGTH: usize = 256;

/// Search result pages fetched per request
const SEARCH_PAGE_SIZE: u64 = 40;

/// Configuration for the marketplace client
#[derive(Debug, Clone)]
pub struct SgwConfig {
    /// Base URL for the buyer API
    pub base_url: String,
    /// Signin page URL (cookie bootstrap for login)
    pub login_page_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for SgwConfig {
    fn default() -> Self {
        Self {
            base_url: API_ROOT.to_string(),
            login_page_url: LOGIN_PAGE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Authenticated client for the ShopGoodwill buyer API
pub struct SgwClient {
    config: SgwConfig,
    http: reqwest::Client,
    token: String,
    observer: Option<mpsc::UnboundedSender<StatusObservation>>,
}

impl SgwClient {
    /// Connect with the default configuration.
    pub async fn connect(
        creds: &Credentials,
        observer: Option<mpsc::UnboundedSender<StatusObservation>>,
    ) -> Result<Self, ClientError> {
        Self::connect_with_config(SgwConfig::default(), creds, observer).await
    }

    /// Connect against a custom API root (tests, mirrors).
    pub async fn connect_with_config(
        config: SgwConfig,
        creds: &Credentials,
        observer: Option<mpsc::UnboundedSender<StatusObservation>>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        let mut client = Self {
            config,
            http,
            token: String::new(),
            observer,
        };

        if let Some(token) = &creds.access_token {
            client.token = token.clone();
            if client.probe_token().await? {
                return Ok(client);
            }
            tracing::warn!("configured access token rejected, falling back to login");
            client.token.clear();
        }

        let (username, password) = match (
            &creds.encrypted_username,
            &creds.encrypted_password,
            &creds.username,
            &creds.password,
        ) {
            (Some(user), Some(pass), _, _) => (user.clone(), pass.clone()),
            (_, _, Some(user), Some(pass)) => {
                (encrypt_credential(user), encrypt_credential(pass))
            }
            _ => {
                return Err(ClientError::Auth(
                    "no usable credentials configured".to_string(),
                ))
            }
        };
        client.login(&username, &password).await?;
        Ok(client)
    }

    /// Check whether the current bearer token still works, using the
    /// saved-searches endpoint as a cheap authenticated probe.
    async fn probe_token(&self) -> Result<bool, ClientError> {
        let url = format!("{}/SaveSearches/GetSaveSearches", self.config.base_url);
        match self.execute(self.http.post(&url)).await {
            Ok(_) => Ok(true),
            Err(ClientError::Status { status: 401, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        // The signin page sets cookies the login endpoint expects; its
        // status is irrelevant.
        self.http.get(&self.config.login_page_url).send().await?;

        // clientIpAddress and appVersion are whatever the web app sends;
        // the endpoint checks for their presence, not their truth.
        let params = serde_json::json!({
            "browser": "firefox",
            "remember": false,
            "clientIpAddress": "0.0.0.4",
            "appVersion": "00099a1be3bb023ff17d",
            "username": username,
            "password": password,
        });

        let url = format!("{}/SignIn/Login", self.config.base_url);
        let resp = self
            .execute(self.http.post(&url).json(&params))
            .await
            .map_err(|e| match e {
                ClientError::Status {
                    status: 400 | 401 | 403,
                    ..
                } => ClientError::Auth("login rejected".to_string()),
                other => other,
            })?;

        let body: serde_json::Value = resp.json().await?;
        let token = body
            .get("accessToken")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                ClientError::Malformed("login response missing accessToken".to_string())
            })?;
        self.token = token.to_string();
        tracing::info!("logged in to marketplace");
        Ok(())
    }

    /// The single instrumented call site: attaches the bearer token,
    /// reports the response status to the outage observer, and turns
    /// non-success statuses into errors.
    async fn execute(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let req = if self.token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.token)
        };
        let resp = req.send().await?;
        let status = resp.status();

        if let Some(observer) = &self.observer {
            let _ = observer.send(StatusObservation {
                status: status.as_u16(),
                at: Utc::now(),
            });
        }

        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            Err(ClientError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Marketplace for SgwClient {
    async fn favorites(&self) -> Result<HashMap<i64, FavoriteEntry>, ClientError> {
        let url = format!(
            "{}/Favorite/GetAllFavoriteItemsByType",
            self.config.base_url
        );
        let resp = self
            .execute(
                self.http
                    .post(&url)
                    .query(&[("Type", "open")])
                    .json(&serde_json::json!({})),
            )
            .await?;
        let body: FavoritesResponse = resp.json().await?;

        let mut entries = HashMap::new();
        for raw in body.data.unwrap_or_default() {
            match FavoriteEntry::try_from(raw) {
                Ok(entry) => {
                    entries.insert(entry.item_id, entry);
                }
                Err(e) => tracing::warn!(error = %e, "skipping favorite with malformed fields"),
            }
        }
        Ok(entries)
    }

    async fn item_detail(&self, item_id: i64) -> Result<ItemDetail, ClientError> {
        let url = format!(
            "{}/itemDetail/GetItemDetailModelByItemId/{item_id}",
            self.config.base_url
        );
        let resp = self.execute(self.http.get(&url)).await?;
        Ok(resp.json().await?)
    }

    async fn quick_bid_detail(&self, item_id: i64) -> Result<QuickBidDetail, ClientError> {
        let url = format!("{}/itemBid/ShowBidModal", self.config.base_url);
        let resp = self
            .execute(self.http.get(&url).query(&[("itemId", item_id)]))
            .await?;
        Ok(resp.json().await?)
    }

    async fn place_bid(
        &self,
        item_id: i64,
        amount: Decimal,
        seller_id: i64,
    ) -> Result<(), ClientError> {
        let payload = serde_json::json!({
            "itemId": item_id,
            "bidAmount": format!("{:.2}", amount.round_dp(2)),
            "sellerId": seller_id,
            "quantity": 1,
        });
        let url = format!("{}/ItemBid/PlaceBid", self.config.base_url);
        self.execute(self.http.post(&url).json(&payload)).await?;
        Ok(())
    }

    async fn add_favorite(&self, item_id: i64, note: Option<&str>) -> Result<(), ClientError> {
        let url = format!("{}/Favorite/AddToFavorite", self.config.base_url);
        self.execute(self.http.get(&url).query(&[("itemId", item_id)]))
            .await?;
        if let Some(note) = note {
            self.set_favorite_note(item_id, note).await?;
        }
        Ok(())
    }

    async fn set_favorite_note(&self, item_id: i64, note: &str) -> Result<(), ClientError> {
        let note: String = if note.chars().count() > MAX_NOTE_LENGTH {
            tracing::warn!(item_id, "favorite note too long, truncating to {MAX_NOTE_LENGTH} chars");
            note.chars().take(MAX_NOTE_LENGTH).collect()
        } else {
            note.to_string()
        };

        // The note is keyed by watchlist id, which only the favorites
        // snapshot knows.
        let favorites = self.favorites().await?;
        let entry = favorites
            .get(&item_id)
            .ok_or(ClientError::NotFavorited(item_id))?;

        let url = format!("{}/Favorite/Save", self.config.base_url);
        self.execute(self.http.post(&url).json(&serde_json::json!({
            "notes": note,
            "watchlistId": entry.watchlist_id,
        })))
        .await?;
        Ok(())
    }

    async fn saved_searches(&self) -> Result<Vec<serde_json::Value>, ClientError> {
        let url = format!("{}/SaveSearches/GetSaveSearches", self.config.base_url);
        let resp = self.execute(self.http.post(&url)).await?;
        let body: serde_json::Value = resp.json().await?;
        Ok(body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &serde_json::Value) -> Result<Vec<Listing>, ClientError> {
        let mut query = query.clone();
        if !query.is_object() {
            return Err(ClientError::Malformed(
                "search query must be a JSON object".to_string(),
            ));
        }
        if query.get("pageSize").is_none() {
            query["pageSize"] = serde_json::json!(SEARCH_PAGE_SIZE);
        }

        let url = format!("{}/Search/ItemListing", self.config.base_url);
        let mut listings = Vec::new();
        let mut seen = 0u64;
        let mut page = 1u64;

        loop {
            query["page"] = serde_json::json!(page);
            let resp = self.execute(self.http.post(&url).json(&query)).await?;
            let body: serde_json::Value = resp.json().await?;
            let result = parse_search_page(&body)?;

            if result.listings.is_empty() && result.raw_count == 0 {
                break;
            }
            seen += result.raw_count as u64;
            listings.extend(result.listings);

            if result.item_count.is_some_and(|total| seen >= total) {
                break;
            }
            page += 1;
        }
        Ok(listings)
    }
}

/// One parsed page of search results.
#[derive(Debug)]
pub(crate) struct SearchPage {
    pub listings: Vec<Listing>,
    /// Items the page carried before any parse-skips.
    pub raw_count: usize,
    /// Server-reported total across all pages.
    pub item_count: Option<u64>,
}

/// Parse a `Search/ItemListing` response body.
///
/// A response without `categoryListModel` is the endpoint's way of
/// reporting an error while still returning 200.
pub(crate) fn parse_search_page(body: &serde_json::Value) -> Result<SearchPage, ClientError> {
    if body.get("categoryListModel").map_or(true, |v| v.is_null()) {
        return Err(ClientError::Malformed(
            "query response missing categoryListModel".to_string(),
        ));
    }

    let results = body.get("searchResults").cloned().unwrap_or_default();
    let items = results
        .get("items")
        .and_then(|i| i.as_array())
        .cloned()
        .unwrap_or_default();
    let item_count = results.get("itemCount").and_then(|c| c.as_u64());

    let raw_count = items.len();
    let mut listings = Vec::with_capacity(raw_count);
    for item in items {
        match serde_json::from_value::<Listing>(item) {
            Ok(listing) => listings.push(listing),
            Err(e) => tracing::warn!(error = %e, "skipping unparseable search listing"),
        }
    }

    Ok(SearchPage {
        listings,
        raw_count,
        item_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sgw_config_default() {
        let config = SgwConfig::default();
        assert_eq!(config.base_url, API_ROOT);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_parse_search_page() {
        let body = json!({
            "categoryListModel": {},
            "searchResults": {
                "itemCount": 3,
                "items": [
                    {"itemId": 1, "title": "a"},
                    {"itemId": 2, "title": "b"},
                ]
            }
        });
        let page = parse_search_page(&body).unwrap();
        assert_eq!(page.raw_count, 2);
        assert_eq!(page.listings.len(), 2);
        assert_eq!(page.item_count, Some(3));
    }

    #[test]
    fn test_parse_search_page_empty() {
        let body = json!({
            "categoryListModel": {},
            "searchResults": {"itemCount": 0, "items": []}
        });
        let page = parse_search_page(&body).unwrap();
        assert_eq!(page.raw_count, 0);
        assert!(page.listings.is_empty());
    }

    #[test]
    fn test_parse_search_page_error_response() {
        // 200 with a null categoryListModel is how the endpoint reports
        // errors
        let body = json!({"categoryListModel": null, "searchResults": {"items": []}});
        assert!(parse_search_page(&body).is_err());

        let body = json!({"searchResults": {"items": []}});
        assert!(parse_search_page(&body).is_err());
    }

    #[test]
    fn test_parse_search_page_skips_bad_listings() {
        let body = json!({
            "categoryListModel": {},
            "searchResults": {
                "itemCount": 2,
                "items": [
                    {"itemId": 1, "title": "good"},
                    {"title": "no item id"},
                ]
            }
        });
        let page = parse_search_page(&body).unwrap();
        // the bad listing still counts toward pagination
        assert_eq!(page.raw_count, 2);
        assert_eq!(page.listings.len(), 1);
    }
}
