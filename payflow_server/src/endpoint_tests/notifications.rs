use actix_web::{
    http::{header::CONTENT_TYPE, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use payflow_engine::{
    db_types::{NewNotification, Notification, NotificationStatus},
    test_utils::prepare_env::prepare_test_env,
    traits::NotificationStore,
    ConnectionRegistry,
    NotificationApi,
    SqliteDatabase,
};

use super::helpers::{admin, customer, identity, send};
use crate::{
    auth::IDENTITY_HEADER,
    data_objects::NotificationPage,
    routes::{MarkNotificationReadRoute, MyNotificationsRoute, NotificationByIdRoute, NotificationStreamRoute},
};

fn configure(api: NotificationApi<SqliteDatabase>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(api))
            .service(MyNotificationsRoute::<SqliteDatabase>::new())
            .service(NotificationStreamRoute::<SqliteDatabase>::new())
            .service(NotificationByIdRoute::<SqliteDatabase>::new())
            .service(MarkNotificationReadRoute::<SqliteDatabase>::new());
    }
}

fn for_receiver(receiver_id: i64) -> NewNotification {
    NewNotification::new("payment", "Your payment has been received.").with_receiver(receiver_id)
}

#[actix_web::test]
async fn list_my_notifications() {
    let env = prepare_test_env().await;
    env.db.insert_notification(for_receiver(5)).await.unwrap();
    env.db.insert_notification(for_receiver(5)).await.unwrap();
    env.db.insert_notification(for_receiver(6)).await.unwrap();
    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());

    let req = TestRequest::get().uri("/notifications?limit=1").insert_header(customer(5));
    let (status, body) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let page: NotificationPage = serde_json::from_str(&body).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.limit, 1);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.notifications.len(), 1);
    assert_eq!(page.notifications[0].receiver_id, Some(5));
}

#[actix_web::test]
async fn anonymous_callers_have_no_notifications() {
    let env = prepare_test_env().await;
    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let req = TestRequest::get().uri("/notifications").insert_header((IDENTITY_HEADER, identity("Guest", None)));
    let (status, _) = send(req, configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn notifications_belong_to_their_receiver() {
    let env = prepare_test_env().await;
    let id = env.db.insert_notification(for_receiver(5)).await.unwrap().id;
    let uri = format!("/notifications/{id}");

    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let (status, body) = send(TestRequest::get().uri(&uri).insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let notification: Notification = serde_json::from_str(&body).unwrap();
    assert_eq!(notification.id, id);

    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let (status, _) = send(TestRequest::get().uri(&uri).insert_header(admin()), configure(api)).await;
    assert_eq!(status, StatusCode::OK);

    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let (status, _) = send(TestRequest::get().uri(&uri).insert_header(customer(6)), configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let (status, _) = send(TestRequest::get().uri("/notifications/9999").insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn marking_as_read_twice_changes_nothing() {
    let env = prepare_test_env().await;
    let id = env.db.insert_notification(for_receiver(5)).await.unwrap().id;
    let uri = format!("/notifications/{id}/read");

    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let (status, body) = send(TestRequest::put().uri(&uri).insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first: Notification = serde_json::from_str(&body).unwrap();
    assert_eq!(first.status, NotificationStatus::Read);
    assert!(first.read_at.is_some());

    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let (status, body) = send(TestRequest::put().uri(&uri).insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let second: Notification = serde_json::from_str(&body).unwrap();
    assert_eq!(second.read_at, first.read_at);

    // Somebody else's notification cannot be marked
    let api = NotificationApi::new(env.db.clone(), ConnectionRegistry::new());
    let other = env.db.insert_notification(for_receiver(6)).await.unwrap().id;
    let uri = format!("/notifications/{other}/read");
    let (status, _) = send(TestRequest::put().uri(&uri).insert_header(customer(5)), configure(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let stored = env.db.fetch_notification(other).await.unwrap().unwrap();
    assert_eq!(stored.status, NotificationStatus::Pending);
}

#[actix_web::test]
async fn opening_a_stream_registers_the_caller() {
    let env = prepare_test_env().await;
    let registry = ConnectionRegistry::new();
    let api = NotificationApi::new(env.db.clone(), registry.clone());
    let service = test::init_service(App::new().configure(configure(api))).await;

    let req = TestRequest::get().uri("/notifications/stream").insert_header(customer(5)).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "text/event-stream");
    assert!(registry.get(5).is_some());

    // Closing the stream deregisters it
    drop(res);
    assert!(registry.get(5).is_none());
}
