use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
    Method,
    RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{data_objects::DataEnvelope, ServiceClientError};

/// A thin JSON-over-HTTP transport shared by every service client. It issues exactly one request per call.
#[derive(Clone)]
pub struct ServiceClient {
    client: Arc<Client>,
}

impl ServiceClient {
    pub fn new(timeout: Duration) -> Result<Self, ServiceClientError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceClientError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    /// Sends a request and deserializes the JSON response body. Any non-2xx status is a
    /// [`ServiceClientError::QueryError`] carrying the response text.
    pub async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&B>,
    ) -> Result<T, ServiceClientError> {
        trace!("📡️ {method} {url}");
        let req = self.client.request(method, url).headers(headers);
        self.send(req, url, body).await
    }

    /// Like [`Self::call`], authenticating with HTTP basic auth.
    pub async fn call_with_basic_auth<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        username: &str,
        body: Option<&B>,
    ) -> Result<T, ServiceClientError> {
        trace!("📡️ {method} {url} (basic auth)");
        let req = self.client.request(method, url).basic_auth(username, Some(""));
        self.send(req, url, body).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        mut req: RequestBuilder,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, ServiceClientError> {
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_builder() {
                ServiceClientError::RequestError(e.to_string())
            } else {
                ServiceClientError::ConnectionError(e.to_string())
            }
        })?;
        let status = response.status();
        if status.is_success() {
            trace!("📡️ {url} answered {status}");
            response.json::<T>().await.map_err(|e| ServiceClientError::JsonError(e.to_string()))
        } else {
            let message = response.text().await.map_err(|e| ServiceClientError::ConnectionError(e.to_string()))?;
            debug!("📡️ {url} answered {status}. {message}");
            Err(ServiceClientError::QueryError { status: status.as_u16(), message })
        }
    }

    /// Like [`Self::call`], for services that wrap their payload in a `{"data": ...}` envelope.
    pub async fn call_for_data<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&B>,
    ) -> Result<T, ServiceClientError> {
        let envelope = self.call::<DataEnvelope<T>, B>(method, url, headers, body).await?;
        envelope.data.ok_or(ServiceClientError::EmptyResponse)
    }
}
