//! Run command implementation

use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::FavoritesCache;
use crate::client::{Marketplace, SgwClient};
use crate::config::{AuthMode, Config};
use crate::outage;
use crate::sniper::{ActionExecutor, Scheduler};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log bid intents without submitting them
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let dry_run = self.dry_run || config.sniper.dry_run;

        let (obs_tx, obs_rx) = mpsc::unbounded_channel();
        let monitor = outage::spawn_outage_monitor(obs_rx);

        let command: Arc<dyn Marketplace> = Arc::new(
            SgwClient::connect(config.auth.command_credentials()?, Some(obs_tx.clone())).await?,
        );
        let bidder: Arc<dyn Marketplace> = match config.auth.mode {
            AuthMode::Universal => Arc::clone(&command),
            AuthMode::CommandBid => Arc::new(
                SgwClient::connect(config.auth.bid_credentials()?, Some(obs_tx.clone())).await?,
            ),
        };
        drop(obs_tx);

        let cache = Arc::new(FavoritesCache::new(Arc::clone(&command)));
        let executor = Arc::new(ActionExecutor::new(
            Arc::clone(&cache),
            Arc::clone(&command),
            bidder,
            config.sniper.friend_list.clone(),
            Duration::from_secs(config.sniper.favorites_max_cache_seconds),
            dry_run,
        ));
        let scheduler = Scheduler::new(&config.sniper, cache, executor, command);

        if dry_run {
            tracing::info!("dry-run mode: bids will be logged, never submitted");
        }
        tracing::info!(
            refresh_seconds = config.sniper.refresh_seconds,
            "bid sniper started"
        );

        tokio::select! {
            _ = scheduler.run() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
            }
        }

        monitor.abort();
        Ok(())
    }
}
