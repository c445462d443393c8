//! Caller identity at the HTTP boundary.
//!
//! The upstream auth layer authenticates the user and forwards the result in the `X-Caller-Identity` header. Handlers
//! take a [`Caller`] argument to receive the decoded identity; requests without a valid header are rejected with
//! `401 Unauthorized` before the handler runs.
use std::{
    future::{ready, Ready},
    ops::Deref,
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::*;
use payflow_engine::CallerIdentity;

use crate::errors::ServerError;

pub const IDENTITY_HEADER: &str = "X-Caller-Identity";

#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

impl Caller {
    pub fn from_request_headers(req: &HttpRequest) -> Result<Self, ServerError> {
        let header = req.headers().get(IDENTITY_HEADER).ok_or(ServerError::MissingIdentity)?;
        let blob = header.to_str().map_err(|e| {
            debug!("💻️ Caller identity header is not valid text. {e}");
            ServerError::MissingIdentity
        })?;
        let identity = CallerIdentity::from_json(blob).map_err(|e| {
            debug!("💻️ Caller identity could not be decoded. {e}");
            ServerError::InvalidIdentity(e)
        })?;
        trace!("💻️ Request from {identity:?}");
        Ok(Self(identity))
    }

    pub fn into_inner(self) -> CallerIdentity {
        self.0
    }
}

impl Deref for Caller {
    type Target = CallerIdentity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::from_request_headers(req))
    }
}
