//! The auction scheduler
//!
//! One long-lived poll loop over the favorites cache. Each auction whose
//! action window is near enough gets its reminder and snipe-bid tasks
//! dispatched as independent one-shot tokio tasks, and its item id goes
//! into the scheduled set, which only ever grows. There is no
//! cancellation: a task whose auction was unfavorited or reconfigured
//! no-ops at fire time, because the executor re-validates everything.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::cache::FavoritesCache;
use crate::client::Marketplace;
use crate::config::SniperConfig;

use super::offsets::parse_offset;
use super::ActionExecutor;

pub struct Scheduler {
    refresh: Duration,
    cache_max_age: Duration,
    alert_offsets: Vec<chrono::Duration>,
    bid_offset: chrono::Duration,
    /// How far ahead of the nearest action we are willing to park a
    /// timer. Auctions further out are reconsidered on a later poll;
    /// pinning timers for days risks drift and pending-task pileup.
    lookahead: chrono::Duration,
    default_note: Option<String>,
    cache: Arc<FavoritesCache>,
    executor: Arc<ActionExecutor>,
    command: Arc<dyn Marketplace>,
    /// Item ids whose tasks have been dispatched. Append-only; entries
    /// stay even when the favorite disappears.
    scheduled: Mutex<HashSet<i64>>,
}

impl Scheduler {
    pub fn new(
        cfg: &SniperConfig,
        cache: Arc<FavoritesCache>,
        executor: Arc<ActionExecutor>,
        command: Arc<dyn Marketplace>,
    ) -> Self {
        let mut alert_offsets = Vec::new();
        for raw in &cfg.alert_time_deltas {
            match parse_offset(raw).and_then(|d| chrono::Duration::from_std(d).ok()) {
                Some(offset) => alert_offsets.push(offset),
                None => tracing::warn!(offset = %raw, "invalid alert offset, ignoring"),
            }
        }

        let bid_offset = match parse_offset(&cfg.bid_snipe_time_delta)
            .and_then(|d| chrono::Duration::from_std(d).ok())
        {
            Some(offset) => offset,
            None => {
                tracing::warn!(
                    offset = %cfg.bid_snipe_time_delta,
                    "invalid bid snipe offset, using 30 seconds"
                );
                chrono::Duration::seconds(30)
            }
        };

        Self {
            // interval() panics on zero
            refresh: Duration::from_secs(cfg.refresh_seconds.max(1)),
            cache_max_age: Duration::from_secs(cfg.favorites_max_cache_seconds),
            lookahead: chrono::Duration::seconds(cfg.refresh_seconds.saturating_mul(3) as i64),
            alert_offsets,
            bid_offset,
            default_note: cfg.favorite_default_note.clone(),
            cache,
            executor,
            command,
            scheduled: Mutex::new(HashSet::new()),
        }
    }

    /// Run the poll loop forever. Individual failures are logged and
    /// never take the loop down.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.refresh);
        loop {
            ticker.tick().await;
            let dispatched = self.poll_once(Utc::now()).await;
            if dispatched > 0 {
                tracing::info!(dispatched, "scheduling pass dispatched deferred tasks");
            }
        }
    }

    /// One scheduling pass. Returns the number of deferred tasks
    /// dispatched.
    pub async fn poll_once(&self, now: DateTime<Utc>) -> usize {
        let snapshot = self.cache.get(self.cache_max_age).await;
        if let Some(e) = &snapshot.refresh_error {
            if e.is_transient() {
                tracing::warn!(error = %e, "favorites refresh failed, continuing with retained snapshot");
            } else {
                tracing::error!(error = %e, "favorites refresh failed, continuing with retained snapshot");
            }
        }

        let min_offset = self.min_offset();
        let mut scheduled = self.scheduled.lock().await;
        let mut dispatched = 0;

        for (&item_id, entry) in &snapshot.entries {
            if scheduled.contains(&item_id) {
                continue;
            }

            // Lookahead guard: only take on auctions whose last action is
            // within three poll periods.
            if entry.end_time - min_offset <= now + self.lookahead {
                for &offset in &self.alert_offsets {
                    let fire_at = entry.end_time - offset;
                    if fire_at < now {
                        tracing::debug!(item_id, "alert offset already past, skipping");
                        continue;
                    }
                    self.dispatch_alert(item_id, entry.end_time, fire_at);
                    dispatched += 1;
                }

                // A past-due fire time still dispatches: the cached end
                // time may itself be stale, so a last-chance bid goes out
                // immediately.
                self.dispatch_bid(item_id, entry.end_time - self.bid_offset);
                dispatched += 1;

                scheduled.insert(item_id);
                metrics::counter!("sgwsniper_auctions_scheduled").increment(1);
                tracing::debug!(item_id, title = %entry.title, "scheduled deferred actions");
            }

            // Backfill the configured default note onto favorites that
            // have none yet.
            if let Some(note) = &self.default_note {
                if entry.note.is_none() {
                    if let Err(e) = self.command.add_favorite(item_id, Some(note.as_str())).await {
                        tracing::warn!(item_id, error = %e, "failed to backfill default note");
                    }
                }
            }
        }

        dispatched
    }

    fn min_offset(&self) -> chrono::Duration {
        self.alert_offsets
            .iter()
            .copied()
            .chain(std::iter::once(self.bid_offset))
            .min()
            .unwrap_or(self.bid_offset)
    }

    fn dispatch_alert(&self, item_id: i64, end_time: DateTime<Utc>, fire_at: DateTime<Utc>) {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            sleep_until(fire_at).await;
            executor.time_alert(item_id, end_time).await;
        });
    }

    fn dispatch_bid(&self, item_id: i64, fire_at: DateTime<Utc>) {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            sleep_until(fire_at).await;
            let outcome = executor.place_bid(item_id).await;
            tracing::debug!(item_id, ?outcome, "bid task finished");
        });
    }
}

/// Sleep until a wall-clock instant; a past instant returns immediately.
async fn sleep_until(fire_at: DateTime<Utc>) {
    let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
