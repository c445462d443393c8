//! Event channel subscribers.
//!
//! Each runs independently of the payment flow: a failure here never touches the payment that caused the event.
use log::*;

use crate::{
    db_types::{NewNotification, PaymentStatus},
    events::{ConsumerError, PaymentEvent, PaymentEventHandler},
    flow_api::notification_api::NotificationApi,
    traits::{NotificationStore, OrderStatusUpdater},
};

pub const PAYMENT_NOTIFICATION_TYPE: &str = "payment";

/// Forwards payment outcomes to the order service.
#[derive(Debug, Clone)]
pub struct OrderStatusConsumer<U> {
    orders: U,
}

impl<U> OrderStatusConsumer<U> {
    pub fn new(orders: U) -> Self {
        Self { orders }
    }
}

impl<U: OrderStatusUpdater> PaymentEventHandler for OrderStatusConsumer<U> {
    async fn handle_payment_event(&self, event: PaymentEvent) -> Result<(), ConsumerError> {
        trace!("🛒️ Updating order {} to payment status {}", event.order_id, event.payment_status);
        self.orders.update_order_payment_status(&event).await.map_err(|e| {
            warn!("🛒️ Order {} was not updated. {e}", event.order_id);
            ConsumerError::HandlerFailed(e.to_string())
        })?;
        info!("🛒️ Order {} updated: payment {}", event.order_id, event.payment_status);
        Ok(())
    }
}

/// Turns payment events into notifications for the payer.
#[derive(Debug, Clone)]
pub struct PaymentNotifier<B> {
    notifications: NotificationApi<B>,
}

impl<B> PaymentNotifier<B> {
    pub fn new(notifications: NotificationApi<B>) -> Self {
        Self { notifications }
    }
}

/// The notification text for a payment event.
pub fn payment_notification(event: &PaymentEvent) -> NewNotification {
    let (subject, message) = match event.payment_status {
        PaymentStatus::Success => (
            "Payment received",
            format!("Your payment of {} for order {} has been received.", event.gross_amount, event.order_id),
        ),
        PaymentStatus::Pending => (
            "Awaiting payment",
            format!("We are waiting for your payment of {} for order {}.", event.gross_amount, event.order_id),
        ),
        PaymentStatus::Failed => (
            "Payment failed",
            format!("Your payment of {} for order {} did not go through.", event.gross_amount, event.order_id),
        ),
    };
    let mut notification = NewNotification::new(PAYMENT_NOTIFICATION_TYPE.to_string(), message).with_subject(subject);
    notification.receiver_id = event.user_id;
    notification
}

impl<B: NotificationStore> PaymentEventHandler for PaymentNotifier<B> {
    async fn handle_payment_event(&self, event: PaymentEvent) -> Result<(), ConsumerError> {
        if event.user_id.is_none() {
            debug!("🔔️ Payment event for order {} has no payer. No notification sent.", event.order_id);
            return Ok(());
        }
        let notification = self
            .notifications
            .create_notification(payment_notification(&event))
            .await
            .map_err(|e| ConsumerError::HandlerFailed(e.to_string()))?;
        debug!("🔔️ Notification {} created for order {}", notification.id, event.order_id);
        Ok(())
    }
}
