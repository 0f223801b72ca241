//! Hyper `Service` over a [`RestApi`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Collected, LengthLimitError, Limited};
use hyper::body::Incoming;

use restgate_model::RestError;

use crate::api::RestApi;
use crate::body::RestResponseBody;

/// Hyper `Service` implementation serving the routes of a [`RestApi`].
///
/// Bodies are collected up to the configured `max_body_size`; larger bodies
/// are rejected with 413 before routing.
#[derive(Debug, Clone)]
pub struct RestHttpService {
    api: Arc<RestApi>,
}

impl RestHttpService {
    /// Create a new `RestHttpService`.
    #[must_use]
    pub fn new(api: Arc<RestApi>) -> Self {
        Self { api }
    }

    /// The served API.
    #[must_use]
    pub fn api(&self) -> &RestApi {
        &self.api
    }
}

impl hyper::service::Service<http::Request<Incoming>> for RestHttpService {
    type Response = http::Response<RestResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let api = Arc::clone(&self.api);

        Box::pin(async move {
            let (parts, incoming) = req.into_parts();
            let limit = api.config().max_body_size;

            let body = match collect_body(incoming, limit).await {
                Ok(body) => body,
                Err((err, status)) => {
                    tracing::warn!(
                        method = %parts.method,
                        path = parts.uri.path(),
                        error = %err,
                        "failed to read request body",
                    );
                    return Ok(api.reject(&parts, err, status));
                }
            };

            Ok(api.handle(http::Request::from_parts(parts, body)).await)
        })
    }
}

/// Collect the incoming body into a single `Bytes` buffer, up to `limit` bytes.
async fn collect_body(incoming: Incoming, limit: usize) -> Result<Bytes, (RestError, StatusCode)> {
    Limited::new(incoming, limit)
        .collect()
        .await
        .map(Collected::to_bytes)
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                (
                    RestError::decode(format!("request body exceeds {limit} bytes")),
                    StatusCode::PAYLOAD_TOO_LARGE,
                )
            } else {
                (
                    RestError::decode(format!("failed to read request body: {e}")),
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
            }
        })
}
