//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine, whose calls to the database,
//! the sibling services and the event channel are all asynchronous, so worker threads stay free while a payment is in
//! flight.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use payflow_engine::{
    db_types::{NotificationStatus, PaymentStatus},
    events::EventPublisher,
    traits::{CustomerDirectory, NotificationStore, OrderDirectory, OutboxStore, PaymentStore, TransactionGateway},
    NotificationApi,
    PaymentFlowApi,
};

use crate::{
    auth::Caller,
    data_objects::{GatewayNotification, ListParams, NewPaymentParams, NotificationPage},
    errors::ServerError,
    helpers::SignatureVerifier,
    push_stream::open_push_stream,
};

/// Everything the payment routes need from storage.
pub trait PaymentBackend: PaymentStore + OutboxStore {}
impl<T: PaymentStore + OutboxStore> PaymentBackend for T {}

/// Everything the payment routes need from the order and user services.
pub trait SiblingDirectory: OrderDirectory + CustomerDirectory {}
impl<T: OrderDirectory + CustomerDirectory> SiblingDirectory for T {}

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(process_payment => Post "/payments" impl PaymentBackend, SiblingDirectory, TransactionGateway, EventPublisher);
/// Records a payment for an order. Cash on delivery is settled immediately; gateway payments come back `Pending`
/// with the gateway's transaction token in `payment_gateway_id`.
pub async fn process_payment<B, S, G, P>(
    caller: Caller,
    body: web::Json<NewPaymentParams>,
    api: web::Data<PaymentFlowApi<B, S, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentBackend,
    S: SiblingDirectory,
    G: TransactionGateway,
    P: EventPublisher,
{
    let params = body.into_inner();
    debug!("💻️ Payment request for order {} from {caller:?}", params.order_id);
    let request = params.into_request(&caller)?;
    let payment = api.process_payment(request, &caller).await?;
    Ok(HttpResponse::Created().json(payment))
}

route!(payments => Get "/payments" impl PaymentBackend, SiblingDirectory, TransactionGateway, EventPublisher);
/// Lists payments, newest first. Super admins see every payment, everyone else their own.
pub async fn payments<B, S, G, P>(
    caller: Caller,
    query: web::Query<ListParams>,
    api: web::Data<PaymentFlowApi<B, S, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentBackend,
    S: SiblingDirectory,
    G: TransactionGateway,
    P: EventPublisher,
{
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<PaymentStatus>())
        .transpose()
        .map_err(|e| ServerError::InvalidQueryParameter(e.to_string()))?;
    let page = api.fetch_payments(&caller, status, query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(payment_by_id => Get "/payments/{id}" impl PaymentBackend, SiblingDirectory, TransactionGateway, EventPublisher);
pub async fn payment_by_id<B, S, G, P>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<B, S, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentBackend,
    S: SiblingDirectory,
    G: TransactionGateway,
    P: EventPublisher,
{
    let id = path.into_inner();
    let detail = api.fetch_payment_detail(id, &caller).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(payment_for_order => Get "/payments/order/{code}" impl PaymentBackend, SiblingDirectory, TransactionGateway, EventPublisher);
pub async fn payment_for_order<B, S, G, P>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<B, S, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentBackend,
    S: SiblingDirectory,
    G: TransactionGateway,
    P: EventPublisher,
{
    let code = path.into_inner();
    let payment = api.fetch_payment_for_order_code(&code, &caller).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Gateway webhook  ---------------------------------------------
route!(payment_webhook => Post "/webhook/payments" impl PaymentBackend, SiblingDirectory, TransactionGateway, EventPublisher);
/// Payment status notifications from the gateway. These carry no caller identity; when signature checks are
/// enabled, the notification's `signature_key` authenticates it instead.
pub async fn payment_webhook<B, S, G, P>(
    body: web::Json<GatewayNotification>,
    verifier: web::Data<SignatureVerifier>,
    api: web::Data<PaymentFlowApi<B, S, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentBackend,
    S: SiblingDirectory,
    G: TransactionGateway,
    P: EventPublisher,
{
    let notification = body.into_inner();
    info!("💻️ Gateway notification: {} is {}", notification.order_id, notification.transaction_status);
    if !verifier.verify(&notification) {
        return Err(ServerError::InvalidSignature);
    }
    let payment = api.update_status_by_order_code(&notification.order_id, &notification.transaction_status).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Notifications  -----------------------------------------------
route!(my_notifications => Get "/notifications" impl NotificationStore);
pub async fn my_notifications<B: NotificationStore>(
    caller: Caller,
    query: web::Query<ListParams>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let receiver_id = caller.user_id().ok_or(ServerError::AnonymousCaller)?;
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<NotificationStatus>())
        .transpose()
        .map_err(|e| ServerError::InvalidQueryParameter(e.to_string()))?;
    let pagination = query.pagination();
    let (notifications, total) = api.list_notifications(receiver_id, status, pagination).await?;
    Ok(HttpResponse::Ok().json(NotificationPage::new(notifications, total, pagination)))
}

route!(notification_stream => Get "/notifications/stream" impl NotificationStore);
/// Opens a server-sent-events stream of push notifications for the caller. A newer stream for the same user replaces
/// this one.
pub async fn notification_stream<B: NotificationStore>(
    caller: Caller,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let receiver_id = caller.user_id().ok_or(ServerError::AnonymousCaller)?;
    Ok(open_push_stream(api.registry(), receiver_id))
}

route!(notification_by_id => Get "/notifications/{id}" impl NotificationStore);
pub async fn notification_by_id<B: NotificationStore>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notification = api.fetch_notification_for(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(notification))
}

route!(mark_notification_read => Put "/notifications/{id}/read" impl NotificationStore);
/// Marks a notification as read. Repeating the call is harmless and returns the notification unchanged.
pub async fn mark_notification_read<B: NotificationStore>(
    caller: Caller,
    path: web::Path<i64>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.fetch_notification_for(id, &caller).await?;
    let notification = api.mark_as_read(id).await?;
    Ok(HttpResponse::Ok().json(notification))
}
