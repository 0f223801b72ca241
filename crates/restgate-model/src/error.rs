//! restgate error types.
//!
//! Every stage of the pipeline reports failures as a [`RestError`]. Errors are
//! rendered to clients as:
//!
//! ```json
//! { "error": { "kind": "Decode", "message": "invalid request body: ..." } }
//! ```

use std::fmt;
use std::sync::Arc;

/// Well-known restgate error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum RestErrorCode {
    /// A handler operation was left at its default implementation.
    NotImplemented,
    /// Invalid resource registration (missing name, rules without a type).
    Configuration,
    /// The request body could not be decoded.
    Decode,
    /// No serializer is registered for the requested format.
    UnsupportedFormat,
    /// An error returned by a handler operation.
    #[default]
    Handler,
    /// The payload violated a field rule.
    Validation,
    /// The handler rejected the request.
    Unauthorized,
    /// No route matches the request path.
    NotFound,
    /// A route matches the path but not the method.
    MethodNotAllowed,
}

impl RestErrorCode {
    /// Returns the short error code string used as the `kind` field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::Configuration => "Configuration",
            Self::Decode => "Decode",
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::Handler => "Handler",
            Self::Validation => "Validation",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
        }
    }

    /// Returns the HTTP status used when the pipeline itself raises this error.
    ///
    /// Errors returned by handler operations do not use this: they travel with
    /// the verb's default status and are escalated by the dispatcher.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::NotImplemented | Self::UnsupportedFormat => http::StatusCode::NOT_IMPLEMENTED,
            Self::Validation => http::StatusCode::BAD_REQUEST,
            Self::Unauthorized => http::StatusCode::UNAUTHORIZED,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::Configuration | Self::Decode | Self::Handler => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for RestErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A restgate error.
///
/// Cheap to clone so it can live inside a [`RequestContext`](crate::RequestContext)
/// that is rebuilt at every pipeline step.
#[derive(Debug, Clone)]
pub struct RestError {
    /// The error code.
    pub code: RestErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The underlying source error, if any.
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RestError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for RestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for RestError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl RestError {
    /// Create a new `RestError` from an error code.
    #[must_use]
    pub fn new(code: RestErrorCode) -> Self {
        Self {
            message: code.as_str().to_owned(),
            code,
            source: None,
        }
    }

    /// Create a new `RestError` with a custom message.
    #[must_use]
    pub fn with_message(code: RestErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    // -- Convenience constructors --

    /// A handler operation that was not overridden.
    #[must_use]
    pub fn not_implemented(operation: &str) -> Self {
        Self::with_message(
            RestErrorCode::NotImplemented,
            format!("{operation} is not implemented"),
        )
    }

    /// Invalid resource registration.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_message(RestErrorCode::Configuration, message)
    }

    /// Malformed request body.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::with_message(RestErrorCode::Decode, message)
    }

    /// Unknown response format.
    #[must_use]
    pub fn unsupported_format(format: &str) -> Self {
        Self::with_message(
            RestErrorCode::UnsupportedFormat,
            format!("format not implemented: {format}"),
        )
    }

    /// Generic failure raised by a handler operation.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::with_message(RestErrorCode::Handler, message)
    }

    /// Payload rejected by a field rule.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(RestErrorCode::Validation, message)
    }

    /// Request rejected by the handler's authentication.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(RestErrorCode::Unauthorized, message)
    }

    /// No route for the path.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::with_message(RestErrorCode::NotFound, format!("no route for {path}"))
    }

    /// The path is routed, but not for this method.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method, path: &str) -> Self {
        Self::with_message(
            RestErrorCode::MethodNotAllowed,
            format!("method {method} not allowed for {path}"),
        )
    }
}

/// Convenience result type for restgate operations.
pub type RestResult<T> = Result<T, RestError>;
