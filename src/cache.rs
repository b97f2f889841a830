//! Favorites cache
//!
//! Time-bounded memoized view of the remote favorites snapshot. A failed
//! refresh retains the previous snapshot rather than blanking the working
//! set: a transient outage at a scheduled action's fire time must not make
//! every tracked auction look unfavorited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::{ClientError, FavoriteEntry, Marketplace};

/// What a cache read hands back.
#[derive(Debug)]
pub struct Snapshot {
    pub entries: HashMap<i64, FavoriteEntry>,
    /// Set when a refresh was attempted and failed; `entries` is then the
    /// retained stale view. Callers decide whether stale is usable.
    pub refresh_error: Option<ClientError>,
}

/// Single-writer, multi-reader favorites cache.
pub struct FavoritesCache {
    client: Arc<dyn Marketplace>,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    last_updated: Option<Instant>,
    entries: HashMap<i64, FavoriteEntry>,
}

impl FavoritesCache {
    pub fn new(client: Arc<dyn Marketplace>) -> Self {
        Self {
            client,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return the favorites snapshot, refreshing first if it is older
    /// than `max_age`. Concurrent callers serialize on the state lock, so
    /// a burst of expired reads produces one remote fetch, not many.
    pub async fn get(&self, max_age: Duration) -> Snapshot {
        let mut state = self.state.lock().await;

        let fresh = state
            .last_updated
            .is_some_and(|at| at.elapsed() <= max_age);
        if fresh {
            return Snapshot {
                entries: state.entries.clone(),
                refresh_error: None,
            };
        }

        match self.client.favorites().await {
            Ok(entries) => {
                state.entries = entries;
                state.last_updated = Some(Instant::now());
                Snapshot {
                    entries: state.entries.clone(),
                    refresh_error: None,
                }
            }
            Err(e) => Snapshot {
                entries: state.entries.clone(),
                refresh_error: Some(e),
            },
        }
    }
}
