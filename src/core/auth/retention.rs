//! Periodic retention sweep
//!
//! Removes revocation records for tokens that have expired on their own,
//! reset tickets past their audit grace period and idle throttle keys.
//! Store faults are logged and retried on the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::revocation::RevocationList;
use super::throttle::AttemptThrottle;
use crate::core::db::repositories::ResetTicketStore;

/// Counts removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub revoked_tokens: u64,
    pub reset_tickets: u64,
    pub throttle_keys: usize,
}

/// Background task for the retention sweep
pub struct RetentionTask {
    revocations: RevocationList,
    tickets: Arc<dyn ResetTicketStore>,
    throttle: Arc<AttemptThrottle>,
    ticket_retention: chrono::Duration,
}

impl RetentionTask {
    pub fn new(
        revocations: RevocationList,
        tickets: Arc<dyn ResetTicketStore>,
        throttle: Arc<AttemptThrottle>,
        ticket_retention: chrono::Duration,
    ) -> Self {
        Self {
            revocations,
            tickets,
            throttle,
            ticket_retention,
        }
    }

    pub async fn sweep_once(&self) -> SweepReport {
        let now = Utc::now();
        let mut report = SweepReport::default();

        match self.revocations.purge_expired(now).await {
            Ok(count) => report.revoked_tokens = count,
            Err(e) => tracing::warn!("Failed to purge revoked tokens: {}", e),
        }

        let cutoff = now
            .checked_sub_signed(self.ticket_retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        match self.tickets.purge_expired(cutoff).await {
            Ok(count) => report.reset_tickets = count,
            Err(e) => tracing::warn!("Failed to purge reset tickets: {}", e),
        }

        report.throttle_keys = self.throttle.prune_idle(Instant::now());

        tracing::debug!(
            revoked_tokens = report.revoked_tokens,
            reset_tickets = report.reset_tickets,
            throttle_keys = report.throttle_keys,
            "Retention sweep finished"
        );
        report
    }

    /// Run the sweep every `period`, starting immediately
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;
                self.sweep_once().await;
            }
        })
    }
}
