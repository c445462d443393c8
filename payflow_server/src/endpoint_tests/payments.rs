use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use payflow_common::Secret;
use payflow_engine::{
    db_types::{Amount, NewPayment, OrderId, Payment, PaymentMethod, PaymentStatus},
    test_utils::prepare_env::prepare_test_env,
    traits::{PaymentDetail, PaymentPage, PaymentStore},
    PaymentFlowApi,
    SqliteDatabase,
};
use serde_json::json;

use super::{
    helpers::{admin, customer, send},
    mocks::{order, profile, MockGateway, MockServices, RecordingPublisher},
};
use crate::{
    auth::IDENTITY_HEADER,
    helpers::{calculate_gateway_signature, SignatureVerifier},
    routes::{PaymentByIdRoute, PaymentForOrderRoute, PaymentWebhookRoute, PaymentsRoute, ProcessPaymentRoute},
};

type TestPaymentApi = PaymentFlowApi<SqliteDatabase, MockServices, MockGateway, RecordingPublisher>;

const SERVER_KEY: &str = "test-server-key";

fn configure(api: TestPaymentApi) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(SignatureVerifier::new(Secret::new(SERVER_KEY.to_string()), true)))
            .service(ProcessPaymentRoute::<SqliteDatabase, MockServices, MockGateway, RecordingPublisher>::new())
            .service(PaymentsRoute::<SqliteDatabase, MockServices, MockGateway, RecordingPublisher>::new())
            .service(PaymentForOrderRoute::<SqliteDatabase, MockServices, MockGateway, RecordingPublisher>::new())
            .service(PaymentByIdRoute::<SqliteDatabase, MockServices, MockGateway, RecordingPublisher>::new())
            .service(PaymentWebhookRoute::<SqliteDatabase, MockServices, MockGateway, RecordingPublisher>::new());
    }
}

fn cod(order_id: i64, user_id: i64) -> NewPayment {
    NewPayment {
        order_id: OrderId(order_id),
        user_id,
        payment_method: PaymentMethod::CashOnDelivery,
        payment_status: PaymentStatus::Success,
        gross_amount: Amount::from(15_000),
        payment_gateway_id: None,
    }
}

fn pending_gateway(order_id: i64, user_id: i64) -> NewPayment {
    NewPayment {
        payment_method: PaymentMethod::Gateway,
        payment_status: PaymentStatus::Pending,
        payment_gateway_id: Some(format!("snap-{order_id}")),
        ..cod(order_id, user_id)
    }
}

#[actix_web::test]
async fn pay_cash_on_delivery() {
    let env = prepare_test_env().await;
    let publisher = RecordingPublisher::default();
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), publisher.clone());
    let req = TestRequest::post()
        .uri("/payments")
        .insert_header(customer(5))
        .set_json(json!({"order_id": 42, "payment_method": "cod", "gross_amount": 15000}));

    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.order_id, OrderId(42));
    assert_eq!(payment.user_id, 5);
    assert_eq!(payment.payment_status, PaymentStatus::Success);
    assert!(payment.payment_gateway_id.is_none());
    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].order_id, OrderId(42));
    assert_eq!(events[0].user_id, Some(5));
    assert_eq!(events[0].payment_status, PaymentStatus::Success);
}

#[actix_web::test]
async fn pay_through_the_gateway() {
    let env = prepare_test_env().await;
    let mut services = MockServices::new();
    services.expect_fetch_own_profile().times(1).returning(|_| Ok(profile(5)));
    services.expect_fetch_order().times(1).returning(|id, _| Ok(order(id.value())));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_transaction()
        .withf(|txn| txn.order_code == "ORD-42" && txn.buyer_email == "customer5@example.com")
        .times(1)
        .returning(|_| Ok("snap-token-1".to_string()));
    let api = PaymentFlowApi::new(env.db.clone(), services, gateway, RecordingPublisher::default());
    let req = TestRequest::post()
        .uri("/payments")
        .insert_header(customer(5))
        .set_json(json!({"order_id": 42, "payment_method": "gateway", "gross_amount": 15000}));

    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Pending);
    assert_eq!(payment.payment_gateway_id.as_deref(), Some("snap-token-1"));
}

#[actix_web::test]
async fn second_payment_for_an_order_conflicts() {
    let env = prepare_test_env().await;
    env.db.insert_payment(cod(42, 5)).await.unwrap();
    let publisher = RecordingPublisher::default();
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), publisher.clone());
    let req = TestRequest::post()
        .uri("/payments")
        .insert_header(customer(5))
        .set_json(json!({"order_id": 42, "payment_method": "cod", "gross_amount": 15000}));

    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
    assert!(publisher.events().is_empty());
}

#[actix_web::test]
async fn unknown_payment_method_is_rejected() {
    let env = prepare_test_env().await;
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let req = TestRequest::post()
        .uri("/payments")
        .insert_header(customer(5))
        .set_json(json!({"order_id": 42, "payment_method": "barter", "gross_amount": 15000}));

    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(env.db.fetch_payment_for_order(OrderId(42)).await.unwrap().is_none());
}

#[actix_web::test]
async fn payment_without_identity() {
    let env = prepare_test_env().await;
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let req = TestRequest::post()
        .uri("/payments")
        .set_json(json!({"order_id": 42, "payment_method": "cod", "gross_amount": 15000}));
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let req = TestRequest::get().uri("/payments").insert_header((IDENTITY_HEADER, "not json"));
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn customers_cannot_pay_for_someone_else() {
    let env = prepare_test_env().await;
    let publisher = RecordingPublisher::default();
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), publisher.clone());
    let req = TestRequest::post().uri("/payments").insert_header(customer(5)).set_json(
        json!({"order_id": 42, "user_id": 9, "payment_method": "gateway", "gross_amount": 15000}),
    );

    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert!(env.db.fetch_payment_for_order(OrderId(42)).await.unwrap().is_none());
    assert!(publisher.events().is_empty());

    let publisher = RecordingPublisher::default();
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), publisher.clone());
    let req = TestRequest::post()
        .uri("/payments")
        .insert_header(admin())
        .set_json(json!({"order_id": 42, "user_id": 9, "payment_method": "cod", "gross_amount": 15000}));
    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.user_id, 9);
    assert_eq!(publisher.events()[0].user_id, Some(9));
}

#[actix_web::test]
async fn customers_list_their_own_payments() {
    let env = prepare_test_env().await;
    env.db.insert_payment(cod(42, 5)).await.unwrap();
    env.db.insert_payment(cod(43, 6)).await.unwrap();
    let mut services = MockServices::new();
    services
        .expect_fetch_order()
        .withf(|id, token| *id == OrderId(42) && token == "Customer-token")
        .times(1)
        .returning(|id, _| Ok(order(id.value())));
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), RecordingPublisher::default());

    let (status, body) = send(TestRequest::get().uri("/payments").insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let page: PaymentPage = serde_json::from_str(&body).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.payments[0].payment.user_id, 5);
    assert_eq!(page.payments[0].order_code, "ORD-42");
    assert_eq!(page.payments[0].order_shipping_type, "Delivery");
}

#[actix_web::test]
async fn admins_filter_payments_by_status() {
    let env = prepare_test_env().await;
    env.db.insert_payment(cod(42, 5)).await.unwrap();
    env.db.insert_payment(pending_gateway(43, 6)).await.unwrap();
    let mut services = MockServices::new();
    services.expect_fetch_order().times(1).returning(|id, _| Ok(order(id.value())));
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), RecordingPublisher::default());

    let req = TestRequest::get().uri("/payments?status=Pending&page=1&limit=10").insert_header(admin());
    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let page: PaymentPage = serde_json::from_str(&body).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.payments[0].payment.order_id, OrderId(43));

    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let req = TestRequest::get().uri("/payments?status=Refunded").insert_header(admin());
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn very_large_page_numbers_return_an_empty_page() {
    let env = prepare_test_env().await;
    env.db.insert_payment(cod(42, 5)).await.unwrap();
    let mut services = MockServices::new();
    services.expect_fetch_order().never();
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), RecordingPublisher::default());

    let req = TestRequest::get().uri("/payments?page=9223372036854775807").insert_header(admin());
    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let page: PaymentPage = serde_json::from_str(&body).unwrap();
    assert_eq!(page.total, 1);
    assert!(page.payments.is_empty());
}

#[actix_web::test]
async fn payment_detail_is_only_visible_to_its_owner() {
    let env = prepare_test_env().await;
    let id = env.db.insert_payment(cod(42, 5)).await.unwrap().payment.id;
    let mut services = MockServices::new();
    services.expect_fetch_order().times(1).returning(|id, _| Ok(order(id.value())));
    services.expect_fetch_own_profile().times(1).returning(|_| Ok(profile(5)));
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), RecordingPublisher::default());

    let uri = format!("/payments/{id}");
    let (status, body) = send(TestRequest::get().uri(&uri).insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let detail: PaymentDetail = serde_json::from_str(&body).unwrap();
    assert_eq!(detail.payment.id, id);
    assert_eq!(detail.customer_name, "Customer 5");
    assert_eq!(detail.order_code, "ORD-42");

    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let (status, _) = send(TestRequest::get().uri(&uri).insert_header(customer(6)), configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let (status, _) = send(TestRequest::get().uri("/payments/999").insert_header(admin()), configure(api)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn payment_for_order_code() {
    let env = prepare_test_env().await;
    env.db.insert_payment(cod(42, 5)).await.unwrap();
    let mut services = MockServices::new();
    services
        .expect_fetch_order_by_code()
        .withf(|code, _| code == "ORD-42")
        .times(1)
        .returning(|_, _| Ok(order(42)));
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), RecordingPublisher::default());

    let req = TestRequest::get().uri("/payments/order/ORD-42").insert_header(customer(5));
    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.order_id, OrderId(42));
}

fn webhook_body(order_code: &str, transaction_status: &str, signature: Option<String>) -> serde_json::Value {
    json!({
        "order_id": order_code,
        "transaction_status": transaction_status,
        "status_code": "200",
        "gross_amount": "15000.00",
        "signature_key": signature,
    })
}

#[actix_web::test]
async fn gateway_settles_a_pending_payment() {
    let env = prepare_test_env().await;
    env.db.insert_payment(pending_gateway(42, 5)).await.unwrap();
    let mut services = MockServices::new();
    services.expect_resolve_order_id().withf(|code| code == "ORD-42").times(1).returning(|_| Ok(OrderId(42)));
    let publisher = RecordingPublisher::default();
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), publisher.clone());

    let signature = calculate_gateway_signature("ORD-42", "200", "15000.00", SERVER_KEY);
    let req = TestRequest::post().uri("/webhook/payments").set_json(webhook_body("ORD-42", "settlement", Some(signature)));
    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let payment: Payment = serde_json::from_str(&body).unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Success);
    let events = publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payment_status, PaymentStatus::Success);
}

#[actix_web::test]
async fn unsigned_gateway_notifications_are_refused() {
    let env = prepare_test_env().await;
    env.db.insert_payment(pending_gateway(42, 5)).await.unwrap();
    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let req = TestRequest::post().uri("/webhook/payments").set_json(webhook_body("ORD-42", "settlement", None));
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let api = PaymentFlowApi::new(env.db.clone(), MockServices::new(), MockGateway::new(), RecordingPublisher::default());
    let forged = calculate_gateway_signature("ORD-42", "200", "15000.00", "not-the-key");
    let req = TestRequest::post().uri("/webhook/payments").set_json(webhook_body("ORD-42", "settlement", Some(forged)));
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let payment = env.db.fetch_payment_for_order(OrderId(42)).await.unwrap().unwrap();
    assert_eq!(payment.payment_status, PaymentStatus::Pending);
}

#[actix_web::test]
async fn gateway_notification_for_an_unknown_order() {
    let env = prepare_test_env().await;
    let mut services = MockServices::new();
    services
        .expect_resolve_order_id()
        .times(1)
        .returning(|code| Err(payflow_engine::traits::ServiceError::NotFound(code.to_string())));
    let api = PaymentFlowApi::new(env.db.clone(), services, MockGateway::new(), RecordingPublisher::default());
    let signature = calculate_gateway_signature("NOPE", "200", "15000.00", SERVER_KEY);
    let req = TestRequest::post().uri("/webhook/payments").set_json(webhook_body("NOPE", "settlement", Some(signature)));
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
