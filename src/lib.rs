//! sgw-sniper: auction bid sniper and alerting daemon for ShopGoodwill
//!
//! This library provides the core components for:
//! - Marketplace access over the ShopGoodwill buyer API
//! - A time-bounded favorites cache that survives remote outages
//! - Outage window tracking over observed response statuses
//! - The auction scheduler: one poll loop, one-shot deferred tasks
//! - Re-validating reminder alerts and snipe-bid execution
//! - Saved-search alerting with a seen-listings store

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod outage;
pub mod query;
pub mod sniper;
pub mod telemetry;
