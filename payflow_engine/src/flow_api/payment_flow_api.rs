use std::{
    fmt::{Debug, Display},
    future::Future,
    time::Duration,
};

use chrono::Utc;
use futures_util::future::try_join_all;
use log::*;

use crate::{
    db_types::{NewPayment, Pagination, Payment, PaymentMethod, PaymentRequest, PaymentStatus},
    events::{EventPublisher, PaymentEvent},
    flow_api::errors::PaymentApiError,
    identity::CallerIdentity,
    traits::{
        CustomerDirectory,
        CustomerProfile,
        GatewayTransactionRequest,
        OrderDirectory,
        OutboxStore,
        PaymentDetail,
        PaymentPage,
        PaymentQuery,
        PaymentStore,
        PaymentSummary,
        RecordedPayment,
        TransactionGateway,
    },
};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// `PaymentFlowApi` records payments exactly once per order, settles them immediately or through the payment gateway,
/// and tells the rest of the system about it through the event channel.
///
/// * `B` is the storage backend.
/// * `S` fronts the order and user services.
/// * `G` fronts the payment gateway.
/// * `P` publishes to the event channel.
///
/// Every outbound call, store calls included, is bounded by the same per-call timeout. A call that runs out of time is
/// reported as [`PaymentApiError::UpstreamUnavailable`]. Dropping a returned future cancels whatever call is in flight.
pub struct PaymentFlowApi<B, S, G, P> {
    db: B,
    services: S,
    gateway: G,
    publisher: P,
    call_timeout: Duration,
}

impl<B, S, G, P> Debug for PaymentFlowApi<B, S, G, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi(call_timeout: {:?})", self.call_timeout)
    }
}

impl<B, S, G, P> PaymentFlowApi<B, S, G, P> {
    pub fn new(db: B, services: S, gateway: G, publisher: P) -> Self {
        Self { db, services, gateway, publisher, call_timeout: DEFAULT_CALL_TIMEOUT }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    async fn bounded<T, E, F>(&self, what: &str, call: F) -> Result<T, PaymentApiError>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
        PaymentApiError: From<E>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(|e| {
                warn!("🔄️ {what} failed. {e}");
                PaymentApiError::from(e)
            }),
            Err(_) => {
                warn!("🔄️ {what} timed out after {:?}", self.call_timeout);
                Err(PaymentApiError::UpstreamUnavailable(format!("{what} timed out")))
            },
        }
    }
}

impl<B, S, G, P> PaymentFlowApi<B, S, G, P>
where
    B: PaymentStore + OutboxStore,
    S: OrderDirectory + CustomerDirectory,
    G: TransactionGateway,
    P: EventPublisher,
{
    /// Records a payment for an order.
    ///
    /// * Only a super admin may record a payment on behalf of another user. Anyone else gets
    ///   [`PaymentApiError::Forbidden`] unless `request.user_id` is their own id.
    /// * If a live payment already exists for the order, [`PaymentApiError::AlreadyExists`] is returned and nothing
    ///   else happens. The store's uniqueness guarantee backs this check up, so concurrent requests for the same order
    ///   produce exactly one payment.
    /// * Cash on delivery is settled on the spot (`Success`).
    /// * Gateway payments look up the buyer and the order, open a gateway transaction and are stored as `Pending` with
    ///   the gateway's transaction reference.
    ///
    /// Once the payment is committed, its event is published. A publish failure is logged and does not fail the call;
    /// the outbox row written with the payment lets the relay deliver the event later.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
        caller: &CallerIdentity,
    ) -> Result<Payment, PaymentApiError> {
        let order_id = request.order_id;
        trace!("🔄️💳️ Processing {} payment of {} for order {order_id}", request.payment_method, request.gross_amount);
        if !request.gross_amount.is_positive() {
            return Err(PaymentApiError::InvalidAmount(request.gross_amount));
        }
        if !caller.may_act_for(request.user_id) {
            warn!("🔄️💳️ {caller:?} tried to record a payment for order {order_id} on behalf of user {}", request.user_id);
            return Err(PaymentApiError::Forbidden);
        }
        if let Some(existing) = self.bounded("Payment lookup", self.db.fetch_payment_for_order(order_id)).await? {
            info!("🔄️💳️ Payment {} already exists for order {order_id}", existing.id);
            return Err(PaymentApiError::AlreadyExists(order_id));
        }
        let method = request
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(|_| PaymentApiError::InvalidPaymentMethod(request.payment_method.clone()))?;
        let new_payment = match method {
            PaymentMethod::CashOnDelivery => NewPayment {
                order_id,
                user_id: request.user_id,
                payment_method: method,
                payment_status: PaymentStatus::Success,
                gross_amount: request.gross_amount,
                payment_gateway_id: None,
            },
            PaymentMethod::Gateway => {
                let buyer = self.fetch_customer_for(caller, request.user_id).await?;
                let order = self.bounded("Order lookup", self.services.fetch_order(order_id, caller.token())).await?;
                let txn = GatewayTransactionRequest {
                    order_code: order.order_code,
                    amount: request.gross_amount,
                    buyer_name: buyer.name,
                    buyer_email: buyer.email,
                };
                // Any gateway failure is terminal for this request, a 404 included
                let gateway_call = async {
                    self.gateway.create_transaction(&txn).await.map_err(|e| {
                        PaymentApiError::UpstreamUnavailable(format!("The gateway did not open a transaction. {e}"))
                    })
                };
                let gateway_id = self.bounded("Gateway transaction", gateway_call).await?;
                debug!("🔄️💳️ Gateway transaction {gateway_id} opened for order {order_id} ({})", txn.order_code);
                NewPayment {
                    order_id,
                    user_id: request.user_id,
                    payment_method: method,
                    payment_status: PaymentStatus::Pending,
                    gross_amount: request.gross_amount,
                    payment_gateway_id: Some(gateway_id),
                }
            },
        };
        let recorded = self.bounded("Payment insert", self.db.insert_payment(new_payment)).await?;
        self.publish(&recorded).await;
        let payment = recorded.payment;
        info!("🔄️💳️ Payment {} for order {order_id} recorded as {}", payment.id, payment.payment_status);
        Ok(payment)
    }

    /// Applies a gateway status notification. The order code is resolved through the order service's public lookup,
    /// since gateway callbacks carry no caller identity.
    pub async fn update_status_by_order_code(&self, order_code: &str, status: &str) -> Result<Payment, PaymentApiError> {
        let status = PaymentStatus::from_gateway_status(status)
            .map_err(|_| PaymentApiError::InvalidStatus(status.to_string()))?;
        let order_id = self.bounded("Order code lookup", self.services.resolve_order_id(order_code)).await?;
        trace!("🔄️✅️ Order code {order_code} resolved to order {order_id}");
        let recorded = self.bounded("Payment status update", self.db.update_payment_status(order_id, status)).await?;
        self.publish(&recorded).await;
        Ok(recorded.payment)
    }

    /// Lists payments, enriched with live order attributes. Super admins see every payment; everyone else only sees
    /// their own, and a caller without a user id is refused. If any order lookup fails, the whole listing fails.
    pub async fn fetch_payments(
        &self,
        caller: &CallerIdentity,
        status: Option<PaymentStatus>,
        pagination: Pagination,
    ) -> Result<PaymentPage, PaymentApiError> {
        let owner = match (caller.is_super_admin(), caller.user_id()) {
            (true, _) => None,
            (false, Some(user_id)) => Some(user_id),
            (false, None) => {
                warn!("🔄️🔍️ {caller:?} has no user id and cannot list payments");
                return Err(PaymentApiError::Forbidden);
            },
        };
        let mut query = PaymentQuery::new(owner).with_pagination(pagination);
        query.status = status;
        let (payments, total) = self.bounded("Payment search", self.db.search_payments(&query)).await?;
        trace!("🔄️🔍️ {} of {total} payments fetched. Enriching with order details", payments.len());
        let lookups = payments.into_iter().map(|payment| async move {
            let order = self.bounded("Order lookup", self.services.fetch_order(payment.order_id, caller.token())).await?;
            Ok::<_, PaymentApiError>(PaymentSummary {
                payment,
                order_code: order.order_code,
                order_shipping_type: order.shipping_type,
            })
        });
        let summaries = try_join_all(lookups).await?;
        Ok(PaymentPage {
            payments: summaries,
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages: pagination.total_pages(total),
        })
    }

    /// A single payment, enriched with live order and customer attributes.
    pub async fn fetch_payment_detail(&self, id: i64, caller: &CallerIdentity) -> Result<PaymentDetail, PaymentApiError> {
        let payment = self
            .bounded("Payment lookup", self.db.fetch_payment(id))
            .await?
            .ok_or_else(|| PaymentApiError::NotFound(format!("Payment {id}")))?;
        self.check_access(&payment, caller)?;
        let (order, customer) = tokio::try_join!(
            self.bounded("Order lookup", self.services.fetch_order(payment.order_id, caller.token())),
            self.fetch_customer_for(caller, payment.user_id),
        )?;
        Ok(PaymentDetail {
            payment,
            customer_name: customer.name,
            customer_email: customer.email,
            customer_address: customer.address,
            order_code: order.order_code,
            order_shipping_type: order.shipping_type,
            order_at: order.order_datetime,
            order_remarks: order.remarks,
        })
    }

    /// The live payment for the order with the given code.
    pub async fn fetch_payment_for_order_code(
        &self,
        order_code: &str,
        caller: &CallerIdentity,
    ) -> Result<Payment, PaymentApiError> {
        let order = self.bounded("Order lookup", self.services.fetch_order_by_code(order_code, caller.token())).await?;
        let payment = self
            .bounded("Payment lookup", self.db.fetch_payment_for_order(order.id.into()))
            .await?
            .ok_or_else(|| PaymentApiError::NotFound(format!("No payment exists for order {order_code}")))?;
        self.check_access(&payment, caller)?;
        Ok(payment)
    }

    fn check_access(&self, payment: &Payment, caller: &CallerIdentity) -> Result<(), PaymentApiError> {
        if caller.may_act_for(payment.user_id) {
            Ok(())
        } else {
            warn!("🔄️🔍️ {caller:?} tried to read payment {} belonging to user {}", payment.id, payment.user_id);
            Err(PaymentApiError::Forbidden)
        }
    }

    /// Privileged callers look the owner up directly; everyone else can only see their own profile.
    async fn fetch_customer_for(&self, caller: &CallerIdentity, user_id: i64) -> Result<CustomerProfile, PaymentApiError> {
        if caller.is_super_admin() {
            self.bounded("Customer lookup", self.services.fetch_customer(user_id, caller.token())).await
        } else {
            self.bounded("Profile lookup", self.services.fetch_own_profile(caller.token())).await
        }
    }

    /// Publishes the event for a freshly committed change. Failures are logged only; the outbox row is still due and
    /// the relay will deliver it.
    async fn publish(&self, recorded: &RecordedPayment) {
        let Some(outbox_id) = recorded.outbox_id else {
            return;
        };
        let event = PaymentEvent::from(&recorded.payment);
        let publish = tokio::time::timeout(self.call_timeout, self.publisher.publish_payment_event(&event)).await;
        match publish {
            Ok(Ok(receipt)) => {
                debug!("🔄️📬️ Event for order {} published ({receipt})", event.order_id);
                if let Err(e) = self.db.mark_outbox_published(outbox_id, Utc::now()).await {
                    warn!("🔄️📬️ Event for order {} was published but outbox entry {outbox_id} could not be updated. It may be published again. {e}", event.order_id);
                }
            },
            Ok(Err(e)) => {
                error!("🔄️📬️ Could not publish event for order {}. The outbox relay will retry. {e}", event.order_id)
            },
            Err(_) => error!("🔄️📬️ Publishing the event for order {} timed out. The outbox relay will retry.", event.order_id),
        }
    }
}
