use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use payflow_engine::{
    events::{ChannelPublisher, EventHandlers, RedisStreamPublisher},
    ConnectionRegistry,
    NotificationApi,
    OrderStatusConsumer,
    PaymentFlowApi,
    PaymentNotifier,
    SqliteDatabase,
};
use service_clients::{SiblingServices, SnapGatewayApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::SignatureVerifier,
    routes::{
        health,
        MarkNotificationReadRoute,
        MyNotificationsRoute,
        NotificationByIdRoute,
        NotificationStreamRoute,
        PaymentByIdRoute,
        PaymentForOrderRoute,
        PaymentWebhookRoute,
        PaymentsRoute,
        ProcessPaymentRoute,
    },
    workers::{in_process_consumer_hooks, push_delivery_hooks, start_notification_consumer, start_outbox_relay},
};

pub type ServerPaymentApi = PaymentFlowApi<SqliteDatabase, SiblingServices, SnapGatewayApi, ChannelPublisher>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_outbox_delay(chrono::Duration::seconds(config.outbox_delay_secs));
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (services, gateway) =
        SiblingServices::from_config(&config.services).map_err(|e| ServerError::InitializeError(e.to_string()))?;

    // Push delivery runs off the request path. Its hooks need a notification API without producers of their own.
    let push_api = NotificationApi::new(db.clone(), ConnectionRegistry::new()).with_policy(config.delivery_policy);
    let push_handlers = EventHandlers::new(config.push_queue_size, push_delivery_hooks(push_api.clone()));
    let notification_api = push_api.with_producers(push_handlers.producers());
    push_handlers.start_handlers().await;

    let notifier = PaymentNotifier::new(notification_api.clone());
    let publisher = match &config.redis_url {
        Some(url) => {
            let publisher = RedisStreamPublisher::connect(url, &config.channel.stream)
                .await
                .map_err(|e| ServerError::InitializeError(format!("Could not connect to the event channel. {e}")))?;
            start_notification_consumer(url.clone(), config.channel.notification_consumer(), notifier);
            info!("📡️ Payment events are published to '{}'", config.channel.stream);
            ChannelPublisher::Redis(publisher)
        },
        None => {
            let consumers = in_process_consumer_hooks(OrderStatusConsumer::new(services.clone()), notifier);
            let handlers = EventHandlers::new(config.push_queue_size, consumers);
            let producers = handlers.producers();
            handlers.start_handlers().await;
            info!("📬️ Payment events are delivered in-process");
            ChannelPublisher::InProcess(producers)
        },
    };
    start_outbox_relay(db.clone(), publisher.clone(), config.relay_interval);

    let payments_api = PaymentFlowApi::new(db, services, gateway, publisher);
    let verifier = SignatureVerifier::new(config.services.gateway_server_key.clone(), config.webhook_signature_checks);
    let srv = create_server_instance(&config, payments_api, notification_api, verifier)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: &ServerConfig,
    payments_api: ServerPaymentApi,
    notification_api: NotificationApi<SqliteDatabase>,
    verifier: SignatureVerifier,
) -> Result<Server, ServerError> {
    let payments_api = web::Data::new(payments_api);
    let notification_api = web::Data::new(notification_api);
    let verifier = web::Data::new(verifier);
    let srv = HttpServer::new(move || {
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("payflow::access_log"))
            .app_data(payments_api.clone())
            .app_data(notification_api.clone())
            .app_data(verifier.clone());
        // Routes that require a caller identity
        let api_scope = web::scope("/api")
            .service(ProcessPaymentRoute::<SqliteDatabase, SiblingServices, SnapGatewayApi, ChannelPublisher>::new())
            .service(PaymentsRoute::<SqliteDatabase, SiblingServices, SnapGatewayApi, ChannelPublisher>::new())
            .service(PaymentForOrderRoute::<SqliteDatabase, SiblingServices, SnapGatewayApi, ChannelPublisher>::new())
            .service(PaymentByIdRoute::<SqliteDatabase, SiblingServices, SnapGatewayApi, ChannelPublisher>::new())
            .service(MyNotificationsRoute::<SqliteDatabase>::new())
            .service(NotificationStreamRoute::<SqliteDatabase>::new())
            .service(NotificationByIdRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(PaymentWebhookRoute::<SqliteDatabase, SiblingServices, SnapGatewayApi, ChannelPublisher>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
