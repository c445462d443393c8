use std::time::Duration;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    events::{EventPublisher, PaymentEvent},
    traits::{OutboxRetry, OutboxStore, PaymentStoreError},
};

pub const DEFAULT_RELAY_BATCH: i64 = 100;
pub const MAX_BACKOFF_SECS: i64 = 300;

/// The delay before the next attempt after `attempts` failures: 2^attempts seconds, capped at five minutes.
pub fn backoff(attempts: i64) -> chrono::Duration {
    let exp = attempts.clamp(0, 16) as u32;
    chrono::Duration::seconds(i64::min(MAX_BACKOFF_SECS, 2_i64.pow(exp)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub published: usize,
    pub rescheduled: usize,
    pub parked: usize,
}

/// Publishes outbox entries that were not published when their payment was committed.
#[derive(Clone)]
pub struct OutboxRelay<B, P> {
    db: B,
    publisher: P,
    batch_size: i64,
}

impl<B, P> OutboxRelay<B, P>
where
    B: OutboxStore,
    P: EventPublisher,
{
    pub fn new(db: B, publisher: P) -> Self {
        Self { db, publisher, batch_size: DEFAULT_RELAY_BATCH }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Publishes every entry due at `now`. Failed entries are rescheduled with exponential backoff. Entries whose
    /// payload cannot be decoded are parked. A store error on one entry is logged and the rest of the batch still runs.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<RelayReport, PaymentStoreError> {
        let batch = self.db.fetch_due_outbox_entries(now, self.batch_size).await?;
        let mut report = RelayReport::default();
        if batch.is_empty() {
            return Ok(report);
        }
        trace!("📤️ {} outbox entries are due", batch.len());
        for entry in batch {
            let event = match PaymentEvent::from_json(&entry.payload) {
                Ok(event) => event,
                Err(e) => {
                    let reason = format!("Corrupt outbox payload: {e}");
                    match self.db.park_outbox_entry(entry.id, &reason).await {
                        Ok(()) => report.parked += 1,
                        Err(e) => error!("📤️ Could not park outbox entry {}. {e}", entry.id),
                    }
                    continue;
                },
            };
            match self.publisher.publish_payment_event(&event).await {
                Ok(receipt) => match self.db.mark_outbox_published(entry.id, Utc::now()).await {
                    Ok(()) => {
                        debug!("📤️ Outbox entry {} for order {} published ({receipt})", entry.id, entry.order_id);
                        report.published += 1;
                    },
                    Err(e) => error!(
                        "📤️ Outbox entry {} was published ({receipt}) but could not be marked. It may be published again. {e}",
                        entry.id
                    ),
                },
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    let retry = OutboxRetry { attempts, next_attempt_at: now + backoff(attempts) };
                    warn!(
                        "📤️ Publishing outbox entry {} failed (attempt {attempts}). Next attempt at {}. {e}",
                        entry.id, retry.next_attempt_at
                    );
                    match self.db.reschedule_outbox_entry(entry.id, retry, &e.to_string()).await {
                        Ok(()) => report.rescheduled += 1,
                        Err(e) => error!("📤️ Could not reschedule outbox entry {}. {e}", entry.id),
                    }
                },
            }
        }
        Ok(report)
    }

    /// Calls [`Self::tick`] every `interval`, forever.
    pub async fn run(self, interval: Duration) {
        info!("📤️ Outbox relay started. Polling every {interval:?}");
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            match self.tick(Utc::now()).await {
                Ok(report) if report == RelayReport::default() => {},
                Ok(report) => info!(
                    "📤️ Outbox relay published {}, rescheduled {} and parked {}",
                    report.published, report.rescheduled, report.parked
                ),
                Err(e) => error!("📤️ Outbox relay error: {e}"),
            }
        }
    }
}
