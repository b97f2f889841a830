use anyhow::Context;
use clap::Parser;
use sgw_sniper::cli::{Cli, Commands};
use sgw_sniper::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("could not load config from {}", cli.config))?;

    let _telemetry = sgw_sniper::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(&config).await?;
        }
        Commands::Schedule(args) => {
            args.execute(&config).await?;
        }
        Commands::Query(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Auth mode: {:?}", config.auth.mode);
            println!("  Refresh: every {}s", config.sniper.refresh_seconds);
            println!(
                "  Favorites cache: {}s",
                config.sniper.favorites_max_cache_seconds
            );
            println!("  Alert offsets: {:?}", config.sniper.alert_time_deltas);
            println!("  Bid snipe offset: {}", config.sniper.bid_snipe_time_delta);
            println!("  Friends: {}", config.sniper.friend_list.len());
            println!("  Dry run: {}", config.sniper.dry_run);
        }
    }

    Ok(())
}
