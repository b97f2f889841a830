//! Outage window tracking
//!
//! Observes HTTP status codes from the marketplace client and maintains a
//! single open/closed outage window. Advisory only: it shapes log cadence
//! (one line when the outage starts, one when it ends) and never alters
//! retry or scheduling behavior.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One response status, as reported by the marketplace client's
/// instrumented call site.
#[derive(Debug, Clone, Copy)]
pub struct StatusObservation {
    pub status: u16,
    pub at: DateTime<Utc>,
}

/// State change produced by an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutageTransition {
    /// First server error after a healthy stretch.
    Degraded { status: u16, at: DateTime<Utc> },
    /// First non-server-error response after an outage.
    Recovered { elapsed: Duration },
}

/// Tracks a single open/closed outage window over observed statuses.
///
/// Repeated failures while a window is already open are no-ops; there is
/// never more than one open window.
#[derive(Debug, Default)]
pub struct OutageTracker {
    started_at: Option<DateTime<Utc>>,
}

impl OutageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one status code; returns the transition it caused, if any.
    pub fn observe(&mut self, status: u16, at: DateTime<Utc>) -> Option<OutageTransition> {
        let failing = (500..600).contains(&status);
        match (failing, self.started_at) {
            (true, None) => {
                self.started_at = Some(at);
                Some(OutageTransition::Degraded { status, at })
            }
            (true, Some(_)) => None,
            (false, Some(started)) => {
                self.started_at = None;
                Some(OutageTransition::Recovered { elapsed: at - started })
            }
            (false, None) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.started_at.is_some()
    }
}

/// Drain status observations and log outage transitions.
///
/// The returned handle lives as long as any sender side of the channel.
pub fn spawn_outage_monitor(
    mut rx: mpsc::UnboundedReceiver<StatusObservation>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tracker = OutageTracker::new();
        while let Some(obs) = rx.recv().await {
            match tracker.observe(obs.status, obs.at) {
                Some(OutageTransition::Degraded { status, .. }) => {
                    tracing::error!(status, "marketplace outage detected");
                }
                Some(OutageTransition::Recovered { elapsed }) => {
                    tracing::info!(
                        elapsed_secs = elapsed.num_seconds(),
                        "marketplace outage ended"
                    );
                }
                None => {}
            }
        }
    })
}
