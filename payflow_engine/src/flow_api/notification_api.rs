use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewNotification, Notification, NotificationStatus, Pagination},
    events::{EventProducers, NotificationCreatedEvent},
    flow_api::{
        connection_registry::{ConnectionRegistry, TransportError},
        errors::NotificationApiError,
    },
    identity::CallerIdentity,
    traits::{NotificationQuery, NotificationStore},
};

/// What to record when writing to a live connection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// The notification is marked `Sent` anyway. Delivery was attempted; the client can catch up by listing its
    /// notifications.
    #[default]
    AssumeSent,
    /// The notification stays `Pending` unless the write succeeded.
    RequireWrite,
}

impl DeliveryPolicy {
    pub fn from_assume_sent_flag(assume_sent: bool) -> Self {
        if assume_sent {
            Self::AssumeSent
        } else {
            Self::RequireWrite
        }
    }
}

/// What happened to a push. Callers never have to act on this; it exists so that delivery is observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The notification has no receiver, so there is nobody to push to.
    NoReceiver,
    /// The receiver has no live connection. The notification stays `Pending`.
    NoConnection,
    /// Written to the connection and marked `Sent`.
    Delivered,
    /// The write failed, but the notification was marked `Sent` under [`DeliveryPolicy::AssumeSent`].
    WriteFailedMarkedSent(TransportError),
    /// The write failed and the notification stays `Pending` under [`DeliveryPolicy::RequireWrite`].
    WriteFailedLeftPending(TransportError),
}

/// The JSON document pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub subject: Option<String>,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

impl PushMessage {
    pub fn new(notification: &Notification, sent_at: DateTime<Utc>) -> Self {
        Self {
            notification_type: notification.notification_type.clone(),
            subject: notification.subject.clone(),
            message: notification.message.clone(),
            sent_at,
        }
    }
}

/// `NotificationApi` stores notifications, pushes them to connected receivers and tracks whether they have been
/// read.
#[derive(Clone)]
pub struct NotificationApi<B> {
    db: B,
    registry: ConnectionRegistry,
    policy: DeliveryPolicy,
    producers: EventProducers,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi(policy: {:?}, connections: {})", self.policy, self.registry.len())
    }
}

impl<B> NotificationApi<B> {
    pub fn new(db: B, registry: ConnectionRegistry) -> Self {
        Self { db, registry, policy: DeliveryPolicy::default(), producers: EventProducers::default() }
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// New notifications are handed to these producers for push delivery off the calling task.
    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }
}

impl<B> NotificationApi<B>
where B: NotificationStore
{
    /// Best-effort push of `notification` to its receiver. Nothing is ever returned as an error; every failure is
    /// logged and reported through the [`DeliveryOutcome`].
    ///
    /// The `sent_at` in the pushed document is the same instant that is recorded against the notification.
    pub async fn send_push_notification(&self, notification: &Notification) -> DeliveryOutcome {
        let Some(receiver_id) = notification.receiver_id else {
            trace!("🔔️ Notification {} has no receiver. Not pushing it.", notification.id);
            return DeliveryOutcome::NoReceiver;
        };
        let Some(connection) = self.registry.get(receiver_id) else {
            warn!("🔔️ Delivery miss: receiver {receiver_id} has no live connection. Notification {} stays pending.", notification.id);
            return DeliveryOutcome::NoConnection;
        };
        let sent_at = Utc::now();
        let message = PushMessage::new(notification, sent_at);
        let outcome = match connection.write_json(&message) {
            Ok(()) => {
                debug!("🔔️ Notification {} pushed to receiver {receiver_id}", notification.id);
                DeliveryOutcome::Delivered
            },
            Err(e) => {
                error!("🔔️ Could not push notification {} to receiver {receiver_id}. {e}", notification.id);
                if e == TransportError::Closed {
                    self.registry.remove_connection(receiver_id, connection.id());
                }
                match self.policy {
                    DeliveryPolicy::AssumeSent => DeliveryOutcome::WriteFailedMarkedSent(e),
                    DeliveryPolicy::RequireWrite => DeliveryOutcome::WriteFailedLeftPending(e),
                }
            },
        };
        if !matches!(outcome, DeliveryOutcome::WriteFailedLeftPending(_)) {
            if let Err(e) = self.db.mark_notification_sent(notification.id, sent_at).await {
                error!("🔔️ Could not mark notification {} as sent. {e}", notification.id);
            }
        }
        outcome
    }

    /// Stores a new notification and queues it for push delivery. Queueing never blocks; if the push queue is full or
    /// absent the notification simply stays `Pending`.
    pub async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, NotificationApiError> {
        let notification = self.db.insert_notification(notification).await?;
        for producer in &self.producers.notification_producer {
            if let Err(e) = producer.try_publish(NotificationCreatedEvent::new(notification.clone())) {
                warn!("🔔️ Notification {} was not queued for push delivery. {e}", notification.id);
            }
        }
        Ok(notification)
    }

    /// Marks the notification as read. Marking a notification that has already been read is a no-op that returns the
    /// stored record, with its original `read_at`.
    pub async fn mark_as_read(&self, id: i64) -> Result<Notification, NotificationApiError> {
        let notification = self.db.mark_notification_read(id, Utc::now()).await?;
        trace!("🔔️ Notification {id} is {} (read at {:?})", notification.status, notification.read_at);
        Ok(notification)
    }

    pub async fn fetch_notification(&self, id: i64) -> Result<Notification, NotificationApiError> {
        self.db.fetch_notification(id).await?.ok_or(NotificationApiError::NotFound(id))
    }

    /// Fetches the notification on behalf of `caller`. Only the receiver and super admins may see it.
    pub async fn fetch_notification_for(
        &self,
        id: i64,
        caller: &CallerIdentity,
    ) -> Result<Notification, NotificationApiError> {
        let notification = self.fetch_notification(id).await?;
        if caller.is_super_admin() || (caller.user_id().is_some() && caller.user_id() == notification.receiver_id) {
            Ok(notification)
        } else {
            Err(NotificationApiError::Forbidden)
        }
    }

    /// Notifications addressed to `receiver_id`, newest first, with the total number of matches.
    pub async fn list_notifications(
        &self,
        receiver_id: i64,
        status: Option<NotificationStatus>,
        pagination: Pagination,
    ) -> Result<(Vec<Notification>, i64), NotificationApiError> {
        let query = NotificationQuery { receiver_id: Some(receiver_id), status, pagination };
        let result = self.db.search_notifications(&query).await?;
        Ok(result)
    }
}
