//! Query command implementation

use clap::Args;
use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use crate::client::{parse_marketplace_timestamp, Listing, Marketplace, SgwClient};
use crate::config::Config;
use crate::query::{apply_query_defaults, filter_listings, saved_search_to_query, SeenListings};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The saved-search id to execute
    #[arg(short, long)]
    pub query_name: Option<String>,

    /// Execute every saved search
    #[arg(long)]
    pub all: bool,

    /// List runnable saved searches and exit
    #[arg(short, long)]
    pub list_queries: bool,

    /// Log listing URLs in markdown format
    #[arg(long)]
    pub markdown: bool,
}

impl QueryArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = SgwClient::connect(config.auth.command_credentials()?, None).await?;

        // the marketplace doesn't let users name saved searches, so their
        // ids are the names here
        let mut queries: BTreeMap<String, Value> = BTreeMap::new();
        for saved in client.saved_searches().await? {
            let Some(id) = saved_search_id(&saved) else {
                tracing::warn!("skipping saved search without an id");
                continue;
            };
            queries.insert(id, saved_search_to_query(&saved));
        }

        if self.list_queries {
            let names: Vec<&str> = queries.keys().map(String::as_str).collect();
            println!("Saved queries: {}", names.join(", "));
            return Ok(());
        }

        let to_run: Vec<(String, Value)> = if self.all {
            queries.into_iter().collect()
        } else {
            let Some(name) = &self.query_name else {
                anyhow::bail!("pass --query-name or --all");
            };
            let Some(query) = queries.remove(name) else {
                anyhow::bail!("unknown query \"{name}\"");
            };
            vec![(name.clone(), query)]
        };

        let now = Utc::now();
        let mut seen = SeenListings::load(&config.search.seen_listings_path);

        for (name, mut query) in to_run {
            apply_query_defaults(&mut query);

            let listings = match client.search(&query).await {
                Ok(listings) => listings,
                Err(e) => {
                    tracing::error!(query = %name, error = %e, "query failed");
                    continue;
                }
            };

            let time_filter = config
                .search
                .filters
                .get(&name)
                .and_then(|f| f.time_remaining.as_deref())
                .or(config.search.time_remaining.as_deref());
            let matched = filter_listings(&query, listings, time_filter, now);

            let mut fresh = Vec::new();
            for listing in matched {
                if seen.contains(listing.item_id) {
                    continue;
                }
                let end_time = listing
                    .end_time
                    .as_deref()
                    .and_then(|raw| parse_marketplace_timestamp(raw).ok())
                    .unwrap_or(now);
                seen.mark(listing.item_id, end_time);
                fresh.push(listing);
            }

            if !fresh.is_empty() {
                tracing::info!("{}", format_alert(&name, &fresh, self.markdown));
            }
        }

        seen.prune_ended(now);
        seen.save(&config.search.seen_listings_path)?;
        Ok(())
    }
}

fn saved_search_id(saved: &Value) -> Option<String> {
    let id = saved.get("savedSearchId")?;
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn format_alert(query_name: &str, listings: &[Listing], markdown: bool) -> String {
    let mut lines = vec![
        format!("{} new results for query \"{query_name}\"", listings.len()),
        String::new(),
    ];
    for listing in listings {
        let minimum_bid = listing
            .minimum_bid
            .map(|b| b.to_string())
            .unwrap_or_default();
        let end_time = listing.end_time.clone().unwrap_or_default();
        if markdown {
            lines.extend([
                format!("[{}]({}):", listing.title, listing.url()),
                String::new(),
                minimum_bid,
                String::new(),
                end_time,
                String::new(),
            ]);
        } else {
            lines.extend([
                format!("{}:", listing.title),
                minimum_bid,
                end_time,
                listing.url(),
                String::new(),
            ]);
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(item_id: i64, title: &str) -> Listing {
        serde_json::from_value(json!({
            "itemId": item_id,
            "title": title,
            "minimumBid": 9.99,
            "endTime": "2025-06-01T18:00:00",
        }))
        .unwrap()
    }

    #[test]
    fn test_saved_search_id_shapes() {
        assert_eq!(
            saved_search_id(&json!({"savedSearchId": 123})),
            Some("123".to_string())
        );
        assert_eq!(
            saved_search_id(&json!({"savedSearchId": "456"})),
            Some("456".to_string())
        );
        assert_eq!(saved_search_id(&json!({"other": 1})), None);
    }

    #[test]
    fn test_format_alert_plain() {
        let text = format_alert("99", &[listing(42, "Vintage camera")], false);
        assert!(text.starts_with("1 new results for query \"99\""));
        assert!(text.contains("Vintage camera:"));
        assert!(text.contains("9.99"));
        assert!(text.contains("https://shopgoodwill.com/item/42"));
    }

    #[test]
    fn test_format_alert_markdown() {
        let text = format_alert("99", &[listing(42, "Vintage camera")], true);
        assert!(text.contains("[Vintage camera](https://shopgoodwill.com/item/42):"));
    }
}
