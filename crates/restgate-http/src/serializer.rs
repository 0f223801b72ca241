//! Response serializers, selected by format name.
//!
//! Success bodies have the shape:
//!
//! ```json
//! { "data": { "id": "1", "name": "foo" }, "next": "cursor-token" }
//! ```
//!
//! where `next` is omitted when there is no further page. Error bodies are:
//!
//! ```json
//! { "error": { "kind": "Handler", "message": "widget exploded" } }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use restgate_model::{Resource, RestError};

use crate::body::RestResponseBody;

/// Content type for JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of a successful response.
#[derive(Debug, Serialize)]
pub struct SuccessBody<'a> {
    /// The operation result.
    pub data: Option<&'a Resource>,
    /// Cursor of the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<&'a str>,
}

/// Body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    /// Error descriptor.
    pub error: ErrorDetail<'a>,
}

/// Machine-readable kind plus message.
#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    /// Error code, e.g. `Decode`.
    pub kind: &'a str,
    /// Human-readable message.
    pub message: &'a str,
}

impl<'a> From<&'a RestError> for ErrorBody<'a> {
    fn from(error: &'a RestError) -> Self {
        Self {
            error: ErrorDetail {
                kind: error.code.as_str(),
                message: &error.message,
            },
        }
    }
}

/// Renders success and error bodies in one wire format.
pub trait ResponseSerializer: Send + Sync + fmt::Debug {
    /// Content type of produced bodies.
    fn content_type(&self) -> &'static str;

    /// Render a success response.
    fn success_response(
        &self,
        body: &SuccessBody<'_>,
        status: http::StatusCode,
    ) -> http::Response<RestResponseBody>;

    /// Render an error response.
    fn error_response(
        &self,
        error: &RestError,
        status: http::StatusCode,
    ) -> http::Response<RestResponseBody>;
}

/// JSON serializer. Always available as the fallback format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    fn render<T: Serialize>(
        &self,
        value: &T,
        status: http::StatusCode,
    ) -> http::Response<RestResponseBody> {
        match serde_json::to_vec(value) {
            Ok(json) => build_response(json, status, self.content_type()),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response body");
                let fallback = RestError::handler("failed to serialize response");
                let json = serde_json::to_vec(&ErrorBody::from(&fallback)).unwrap_or_default();
                build_response(
                    json,
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    self.content_type(),
                )
            }
        }
    }
}

impl ResponseSerializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn success_response(
        &self,
        body: &SuccessBody<'_>,
        status: http::StatusCode,
    ) -> http::Response<RestResponseBody> {
        self.render(body, status)
    }

    fn error_response(
        &self,
        error: &RestError,
        status: http::StatusCode,
    ) -> http::Response<RestResponseBody> {
        self.render(&ErrorBody::from(error), status)
    }
}

/// Build a response with the given body, status and content type.
#[must_use]
pub fn build_response(
    body: Vec<u8>,
    status: http::StatusCode,
    content_type: &'static str,
) -> http::Response<RestResponseBody> {
    let mut response = http::Response::new(RestResponseBody::from_bytes(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static(content_type),
    );
    response
}

/// Serializers keyed by lowercase format name.
#[derive(Debug, Clone)]
pub struct SerializerRegistry {
    serializers: HashMap<String, Arc<dyn ResponseSerializer>>,
}

impl Default for SerializerRegistry {
    /// A registry with `json` registered.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("json", Arc::new(JsonSerializer));
        registry
    }
}

impl SerializerRegistry {
    /// A registry with no formats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            serializers: HashMap::new(),
        }
    }

    /// Register (or replace) the serializer for `format`.
    pub fn register(&mut self, format: &str, serializer: Arc<dyn ResponseSerializer>) {
        self.serializers.insert(format.to_lowercase(), serializer);
    }

    /// Serializer registered for `format`.
    #[must_use]
    pub fn get(&self, format: &str) -> Option<Arc<dyn ResponseSerializer>> {
        self.serializers.get(&format.to_lowercase()).cloned()
    }

    /// Registered format names, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.serializers.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }
}
