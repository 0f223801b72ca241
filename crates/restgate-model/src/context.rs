//! Immutable per-request context.
//!
//! A [`RequestContext`] is created for every inbound request and threaded
//! through the pipeline by value. Each `with_*` method consumes the context
//! and returns an updated one, so no context is ever mutated while shared.

use crate::error::RestError;
use crate::types::Resource;

/// Default serialization format.
pub const DEFAULT_FORMAT: &str = "json";

/// Default page size for list reads.
pub const DEFAULT_LIMIT: usize = 100;

/// Request-derived inputs plus the response under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    request_id: String,
    path: String,
    version: String,
    resource_id: Option<String>,
    limit: usize,
    cursor: Option<String>,
    response_format: String,
    result: Option<Resource>,
    error: Option<RestError>,
    status: Option<http::StatusCode>,
    next_cursor: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            path: "/".to_owned(),
            version: String::new(),
            resource_id: None,
            limit: DEFAULT_LIMIT,
            cursor: None,
            response_format: DEFAULT_FORMAT.to_owned(),
            result: None,
            error: None,
            status: None,
            next_cursor: None,
        }
    }
}

impl RequestContext {
    /// Create an empty context for the given request id.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    // -- Request-derived inputs --

    /// Set the request path (used to build next-page links).
    #[must_use]
    pub fn with_path(self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self
        }
    }

    /// Set the API version captured from the URI.
    #[must_use]
    pub fn with_version(self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self
        }
    }

    /// Set the resource id captured from the URI.
    #[must_use]
    pub fn with_resource_id(self, resource_id: Option<String>) -> Self {
        Self {
            resource_id,
            ..self
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_limit(self, limit: usize) -> Self {
        Self { limit, ..self }
    }

    /// Set the inbound pagination cursor.
    #[must_use]
    pub fn with_cursor(self, cursor: Option<String>) -> Self {
        Self { cursor, ..self }
    }

    /// Set the requested serialization format.
    #[must_use]
    pub fn with_response_format(self, format: impl Into<String>) -> Self {
        Self {
            response_format: format.into(),
            ..self
        }
    }

    // -- Response state --

    /// Record the operation result.
    #[must_use]
    pub fn with_result(self, result: Option<Resource>) -> Self {
        Self { result, ..self }
    }

    /// Record the operation error (`None` clears it).
    #[must_use]
    pub fn with_error(self, error: Option<RestError>) -> Self {
        Self { error, ..self }
    }

    /// Record the response status.
    #[must_use]
    pub fn with_status(self, status: http::StatusCode) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    /// Record the cursor of the next page. Empty cursors count as none.
    #[must_use]
    pub fn with_next_cursor(self, cursor: Option<String>) -> Self {
        Self {
            next_cursor: cursor.filter(|c| !c.is_empty()),
            ..self
        }
    }

    // -- Accessors --

    /// Request id used for log correlation.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// API version from the URI.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resource id from the URI, for singular operations.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Page size for list reads.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Inbound pagination cursor.
    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Requested serialization format.
    #[must_use]
    pub fn response_format(&self) -> &str {
        &self.response_format
    }

    /// Operation result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Resource> {
        self.result.as_ref()
    }

    /// Recorded error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RestError> {
        self.error.as_ref()
    }

    /// Recorded status, if any.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.status
    }

    /// Cursor of the next page, if any.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// Link to the next page: the request path with the next cursor, the page
    /// size and the format as query parameters.
    #[must_use]
    pub fn next_url(&self) -> Option<String> {
        let cursor = self.next_cursor.as_deref()?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("cursor", cursor)
            .append_pair("limit", &self.limit.to_string())
            .append_pair("format", &self.response_format)
            .finish();
        Some(format!("{}?{query}", self.path))
    }
}
