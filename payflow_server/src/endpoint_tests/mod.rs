use actix_web::{http::StatusCode, test::TestRequest};

use crate::routes::health;

mod helpers;
mod mocks;
mod notifications;
mod payments;

#[actix_web::test]
async fn health_check() {
    let (status, body) = helpers::send(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
