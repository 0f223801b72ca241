//! Response dispatch: status/error reconciliation and serialization.

use std::sync::Arc;

use restgate_model::{RequestContext, RestError};

use crate::body::RestResponseBody;
use crate::serializer::{JsonSerializer, ResponseSerializer, SerializerRegistry, SuccessBody};

/// Turns a finished [`RequestContext`] into exactly one HTTP response.
///
/// 1. The serializer is looked up by the context's format. An unknown format
///    falls back to JSON with status 501 and an `UnsupportedFormat` error,
///    replacing whatever the context recorded.
/// 2. If an error is present, a status below 400 is escalated to 500 and an
///    error body is rendered.
/// 3. Otherwise the result (and next-page cursor) is rendered at the recorded
///    status, 200 if none was recorded.
#[derive(Debug, Clone)]
pub struct ResponseDispatcher {
    serializers: Arc<SerializerRegistry>,
    fallback: Arc<dyn ResponseSerializer>,
}

impl Default for ResponseDispatcher {
    fn default() -> Self {
        Self::new(SerializerRegistry::default())
    }
}

impl ResponseDispatcher {
    /// Create a dispatcher over the given registry.
    #[must_use]
    pub fn new(serializers: SerializerRegistry) -> Self {
        Self {
            serializers: Arc::new(serializers),
            fallback: Arc::new(JsonSerializer),
        }
    }

    /// The formats this dispatcher can render.
    #[must_use]
    pub fn formats(&self) -> Vec<&str> {
        self.serializers.formats()
    }

    /// Render the response for a finished context.
    #[must_use]
    pub fn send_response(&self, ctx: &RequestContext) -> http::Response<RestResponseBody> {
        let mut status = ctx.status();
        let mut error = ctx.error().cloned();

        let format = ctx.response_format();
        let serializer = if let Some(serializer) = self.serializers.get(format) {
            serializer
        } else {
            tracing::warn!(
                request_id = ctx.request_id(),
                format,
                "unsupported response format, falling back to json",
            );
            status = Some(http::StatusCode::NOT_IMPLEMENTED);
            error = Some(RestError::unsupported_format(format));
            Arc::clone(&self.fallback)
        };

        if let Some(error) = error {
            let status = match status {
                Some(s) if s.as_u16() >= 400 => s,
                _ => http::StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::debug!(
                request_id = ctx.request_id(),
                status = status.as_u16(),
                kind = %error.code,
                message = %error.message,
                "sending error response",
            );
            return serializer.error_response(&error, status);
        }

        let status = status.unwrap_or(http::StatusCode::OK);
        let body = SuccessBody {
            data: ctx.result(),
            next: ctx.next_cursor(),
        };
        let mut response = serializer.success_response(&body, status);

        if let Some(url) = ctx.next_url() {
            if let Ok(hv) = http::HeaderValue::from_str(&format!("<{url}>; rel=\"next\"")) {
                response.headers_mut().insert(http::header::LINK, hv);
            }
        }

        tracing::debug!(
            request_id = ctx.request_id(),
            status = status.as_u16(),
            "sending success response",
        );
        response
    }
}
