//! Deferred action execution
//!
//! The alert and bid actions a scheduled task invokes when its timer
//! fires. Minutes to days pass between scheduling and firing, and the
//! state of the world can change in that window, so every precondition is
//! re-checked here against fresh state. An action that no longer applies
//! quietly does nothing.

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::FavoritesCache;
use crate::client::Marketplace;

use super::BidIntent;

/// Cache age forced immediately before a bid; effectively a fresh fetch.
const BID_CACHE_MAX_AGE: Duration = Duration::from_secs(5);

/// Outcome of a bid task. Every abort path is a variant, not an error;
/// the executor has already logged whatever the user needs to know.
#[derive(Debug, Clone, PartialEq)]
pub enum BidOutcome {
    /// The item was unfavorited between scheduling and firing.
    Unfavorited,
    /// The favorite carries no bid ceiling.
    NoIntent,
    /// The note looked like bid intent but the amount was unusable.
    MalformedIntent(String),
    /// The ceiling cannot meet the current minimum acceptable bid.
    BelowMinimum {
        max_bid: Decimal,
        minimum_bid: Decimal,
    },
    /// The current high bidder is on the friend list.
    FriendIsWinning { bidder: String },
    /// Item detail was unavailable or the submission failed. Never
    /// retried: a second attempt moments later would double-bid or fail
    /// the same way.
    Failed(String),
    /// Dry-run mode: the bid that would have been submitted.
    DryRun { amount: Decimal },
    /// The bid went in.
    Submitted { amount: Decimal },
}

/// Executes fired tasks against fresh marketplace state.
pub struct ActionExecutor {
    cache: Arc<FavoritesCache>,
    /// Account used for reads and favorite mutations.
    command: Arc<dyn Marketplace>,
    /// Account used for bid submission; same as `command` outside
    /// command/bid dual-account mode.
    bidder: Arc<dyn Marketplace>,
    friend_list: Vec<String>,
    alert_cache_max_age: Duration,
    dry_run: bool,
}

impl ActionExecutor {
    pub fn new(
        cache: Arc<FavoritesCache>,
        command: Arc<dyn Marketplace>,
        bidder: Arc<dyn Marketplace>,
        friend_list: Vec<String>,
        alert_cache_max_age: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            cache,
            command,
            bidder,
            friend_list,
            alert_cache_max_age,
            dry_run,
        }
    }

    /// Remind the user that an auction is ending, if it is still
    /// favorited. Never errors; never touches remote state.
    pub async fn time_alert(&self, item_id: i64, end_time: DateTime<Utc>) {
        let snapshot = self.cache.get(self.alert_cache_max_age).await;
        if let Some(e) = &snapshot.refresh_error {
            tracing::warn!(item_id, error = %e, "favorites refresh failed before alert, using retained snapshot");
        }

        let Some(favorite) = snapshot.entries.get(&item_id) else {
            tracing::debug!(item_id, "alert fired for unfavorited item, skipping");
            return;
        };

        // truncate both ends to whole seconds for a stable display
        let end = end_time.with_nanosecond(0).unwrap_or(end_time);
        let now = Utc::now();
        let now = now.with_nanosecond(0).unwrap_or(now);
        let remaining = end - now;

        tracing::warn!(
            item_id,
            "time alert - '{}' ending in {}",
            favorite.title,
            format_remaining(remaining)
        );
        metrics::counter!("sgwsniper_alerts_fired").increment(1);
    }

    /// Place the sniped bid for `item_id`, re-validating every
    /// precondition against the freshest state available. All outcomes
    /// are logged here; the returned value exists for callers that want
    /// to inspect what happened.
    pub async fn place_bid(&self, item_id: i64) -> BidOutcome {
        let snapshot = self.cache.get(BID_CACHE_MAX_AGE).await;
        if let Some(e) = &snapshot.refresh_error {
            tracing::warn!(item_id, error = %e, "favorites refresh failed before bid, using retained snapshot");
        }

        let Some(favorite) = snapshot.entries.get(&item_id) else {
            tracing::debug!(item_id, "bid task fired for unfavorited item, skipping");
            return BidOutcome::Unfavorited;
        };
        let title = favorite.title.as_str();

        let max_bid = match BidIntent::parse(favorite.note.as_deref()) {
            BidIntent::Absent => {
                tracing::debug!(item_id, "no bid ceiling set for '{title}', skipping");
                return BidOutcome::NoIntent;
            }
            BidIntent::Malformed(reason) => {
                tracing::error!(item_id, "unusable bid note on '{title}': {reason}");
                return BidOutcome::MalformedIntent(reason);
            }
            BidIntent::Valid { max_bid } => max_bid,
        };

        // The favorites snapshot doesn't carry enough to bid safely; the
        // item detail is the authority on price and seller.
        let detail = match self.command.item_detail(item_id).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!(item_id, error = %e, "could not fetch item detail for '{title}', not bidding");
                return BidOutcome::Failed(e.to_string());
            }
        };

        let Some(minimum_bid) = detail.min_acceptable_bid() else {
            tracing::error!(item_id, "item detail for '{title}' carries no minimum bid, not bidding");
            return BidOutcome::Failed("item detail missing minimum bid".to_string());
        };
        if max_bid < minimum_bid {
            tracing::info!(
                item_id,
                %max_bid,
                %minimum_bid,
                "max bid below minimum acceptable bid for '{title}', not bidding"
            );
            return BidOutcome::BelowMinimum {
                max_bid,
                minimum_bid,
            };
        }

        if !self.friend_list.is_empty() {
            if let Some(top_bidder) = detail.top_bidder() {
                if self.friend_list.iter().any(|f| f == top_bidder) {
                    tracing::info!(
                        item_id,
                        bidder = top_bidder,
                        "current high bidder on '{title}' is a friend, not bidding"
                    );
                    return BidOutcome::FriendIsWinning {
                        bidder: top_bidder.to_string(),
                    };
                }
            }
        }

        let seller_id = detail.seller_id.unwrap_or(favorite.seller_id);

        if self.dry_run {
            tracing::warn!(item_id, "DRY-RUN: would place bid on '{title}' for {max_bid}");
            return BidOutcome::DryRun { amount: max_bid };
        }

        match self.bidder.place_bid(item_id, max_bid, seller_id).await {
            Ok(()) => {
                // log only after the submission went through
                tracing::warn!(item_id, "placed bid on '{title}' for {max_bid}");
                metrics::counter!("sgwsniper_bids_submitted").increment(1);
                BidOutcome::Submitted { amount: max_bid }
            }
            Err(e) => {
                tracing::error!(item_id, error = %e, "bid submission failed for '{title}'");
                BidOutcome::Failed(e.to_string())
            }
        }
    }
}

fn format_remaining(remaining: chrono::Duration) -> String {
    let total = remaining.num_seconds();
    if total < 0 {
        return format!("-{}", format_remaining(-remaining));
    }
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
