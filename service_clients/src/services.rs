use payflow_engine::{
    db_types::OrderId,
    events::PaymentEvent,
    traits::{CustomerDirectory, CustomerProfile, OrderDetail, OrderDirectory, OrderStatusUpdater, ServiceError},
};

use crate::{
    OrderServiceApi,
    ServiceClient,
    ServiceClientConfig,
    ServiceClientError,
    SnapGatewayApi,
    UserServiceApi,
};

/// The order and user services behind the engine's directory traits.
#[derive(Clone)]
pub struct SiblingServices {
    orders: OrderServiceApi,
    users: UserServiceApi,
}

impl SiblingServices {
    pub fn new(orders: OrderServiceApi, users: UserServiceApi) -> Self {
        Self { orders, users }
    }

    /// Builds the sibling clients and the gateway client from `config`. They share one connection pool.
    pub fn from_config(config: &ServiceClientConfig) -> Result<(Self, SnapGatewayApi), ServiceClientError> {
        let client = ServiceClient::new(config.call_timeout)?;
        let orders = OrderServiceApi::new(config.order_service_url.clone(), client.clone());
        let users = UserServiceApi::new(config.user_service_url.clone(), client.clone());
        let gateway = SnapGatewayApi::new(config.gateway_url.clone(), config.gateway_server_key.clone(), client);
        Ok((Self::new(orders, users), gateway))
    }

    pub fn orders(&self) -> &OrderServiceApi {
        &self.orders
    }

    pub fn users(&self) -> &UserServiceApi {
        &self.users
    }
}

impl OrderDirectory for SiblingServices {
    async fn fetch_order(&self, order_id: OrderId, token: &str) -> Result<OrderDetail, ServiceError> {
        Ok(self.orders.get_order(order_id, token).await?)
    }

    async fn fetch_order_by_code(&self, order_code: &str, token: &str) -> Result<OrderDetail, ServiceError> {
        Ok(self.orders.get_order_by_code(order_code, token).await?)
    }

    async fn resolve_order_id(&self, order_code: &str) -> Result<OrderId, ServiceError> {
        let order = self.orders.get_public_order(order_code).await?;
        Ok(OrderId(order.order_id))
    }
}

impl CustomerDirectory for SiblingServices {
    async fn fetch_own_profile(&self, token: &str) -> Result<CustomerProfile, ServiceError> {
        Ok(self.users.get_profile(token).await?)
    }

    async fn fetch_customer(&self, user_id: i64, token: &str) -> Result<CustomerProfile, ServiceError> {
        Ok(self.users.get_customer(user_id, token).await?)
    }
}

impl OrderStatusUpdater for SiblingServices {
    async fn update_order_payment_status(&self, event: &PaymentEvent) -> Result<(), ServiceError> {
        Ok(self.orders.update_payment_status(event).await?)
    }
}
