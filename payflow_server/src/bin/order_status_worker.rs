//! Forwards payment outcomes from the event channel to the order service.
//!
//! Every worker in the same consumer group shares the stream, so several can run side by side. A message is only
//! acknowledged once the order service has accepted the update; anything else is retried.
use dotenvy::dotenv;
use log::*;
use payflow_engine::{events::RedisStreamConsumer, OrderStatusConsumer};
use payflow_server::{cli::handle_command_line_args, config::ServerConfig, workers::shutdown_signal};
use service_clients::SiblingServices;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();
    let Some(redis_url) = config.redis_url.as_deref() else {
        error!("🛒️ PAYFLOW_REDIS_URL is not set. There is no event channel to consume.");
        std::process::exit(1);
    };
    let services = match SiblingServices::from_config(&config.services) {
        Ok((services, _)) => services,
        Err(e) => {
            error!("🛒️ Could not create the order service client. {e}");
            std::process::exit(1);
        },
    };
    let consumer = match RedisStreamConsumer::connect(redis_url, config.channel.order_status_consumer()).await {
        Ok(c) => c,
        Err(e) => {
            error!("📡️ Could not join the order-status consumer group. {e}");
            std::process::exit(1);
        },
    };
    consumer.run(OrderStatusConsumer::new(services), shutdown_signal()).await;
    info!("🛒️ Order status worker stopped");
}
