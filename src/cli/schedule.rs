//! Schedule command implementation

use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;

use crate::client::{Marketplace, SgwClient};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// The item ID for which to schedule a bid
    pub item_id: i64,

    /// The max bid amount the snipe may submit
    pub max_bid: Decimal,
}

impl ScheduleArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = SgwClient::connect(config.auth.command_credentials()?, None).await?;

        // cheap pre-flight so a typoed item id fails here, not at the
        // snipe
        let detail = client
            .quick_bid_detail(self.item_id)
            .await
            .with_context(|| format!("item {} lookup failed", self.item_id))?;
        if let Some(current_price) = detail.current_price {
            tracing::info!(
                item_id = self.item_id,
                %current_price,
                "scheduling bid on '{}'",
                detail.title
            );
        }

        // favoriting an already-favorited item just updates the note
        let note = serde_json::json!({ "max_bid": self.max_bid }).to_string();
        client.add_favorite(self.item_id, Some(note.as_str())).await?;

        tracing::info!(
            item_id = self.item_id,
            max_bid = %self.max_bid,
            "bid scheduled"
        );
        Ok(())
    }
}
