//! Background work that runs next to the HTTP server.
//!
//! * The outbox relay, which publishes payment events that could not be published when the payment was committed.
//! * Push delivery, fed by a bounded in-process queue so that request handlers never wait on client connections.
//! * Payment event consumers. With a broker configured, the notification consumer group runs here and the order-status
//!   consumer runs in its own process (`order_status_worker`). Without one, both run as in-process hooks.
use std::time::Duration;

use log::*;
use payflow_engine::{
    events::{ChannelPublisher, ConsumerConfig, EventHooks, PaymentEventHandler, RedisStreamConsumer},
    NotificationApi,
    OrderStatusConsumer,
    OutboxRelay,
    PaymentNotifier,
    SqliteDatabase,
};
use service_clients::SiblingServices;
use tokio::task::JoinHandle;

/// Hooks that push each newly created notification to its receiver.
pub fn push_delivery_hooks(api: NotificationApi<SqliteDatabase>) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_notification_created(move |ev| {
        let api = api.clone();
        Box::pin(async move {
            let outcome = api.send_push_notification(&ev.notification).await;
            trace!("🔔️ Push for notification {}: {outcome:?}", ev.notification.id);
        })
    });
    hooks
}

/// Hooks that stand in for the event channel consumers when there is no broker.
pub fn in_process_consumer_hooks(
    orders: OrderStatusConsumer<SiblingServices>,
    notifier: PaymentNotifier<SqliteDatabase>,
) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_payment_event(move |event| {
        let orders = orders.clone();
        let notifier = notifier.clone();
        Box::pin(async move {
            let order_id = event.order_id;
            if let Err(e) = orders.handle_payment_event(event.clone()).await {
                error!("🛒️ Order {order_id} was not updated and will not be retried in-process. {e}");
            }
            if let Err(e) = notifier.handle_payment_event(event).await {
                error!("🔔️ No notification was created for order {order_id}. {e}");
            }
        })
    });
    hooks
}

pub fn start_outbox_relay(db: SqliteDatabase, publisher: ChannelPublisher, interval: Duration) -> JoinHandle<()> {
    let relay = OutboxRelay::new(db, publisher);
    tokio::spawn(relay.run(interval))
}

/// Runs the notification consumer group on the broker until the process receives Ctrl-C.
pub fn start_notification_consumer(
    redis_url: String,
    config: ConsumerConfig,
    notifier: PaymentNotifier<SqliteDatabase>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let group = config.group.clone();
        match RedisStreamConsumer::connect(&redis_url, config).await {
            Ok(consumer) => consumer.run(notifier, shutdown_signal()).await,
            Err(e) => error!("📡️ Consumer group '{group}' could not start. {e}"),
        }
    })
}

/// Resolves when the process receives Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("📡️ Could not listen for the shutdown signal. {e}");
        std::future::pending::<()>().await;
    }
}
