use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use serde_json::json;

use crate::auth::IDENTITY_HEADER;

/// The identity blob the upstream auth layer would attach for this caller.
pub fn identity(role: &str, user_id: Option<i64>) -> String {
    json!({ "token": format!("{role}-token"), "role_name": role, "user_id": user_id }).to_string()
}

pub fn customer(user_id: i64) -> (&'static str, String) {
    (IDENTITY_HEADER, identity("Customer", Some(user_id)))
}

pub fn admin() -> (&'static str, String) {
    (IDENTITY_HEADER, identity("Super Admin", Some(1)))
}

/// Sends `req` to an app set up by `configure` and returns the status and body.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let service = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
