//! Request context extraction and payload decoding.

use bytes::Bytes;

use restgate_core::{RESOURCE_ID_KEY, VERSION_KEY};
use restgate_model::{Payload, RequestContext, RestError, RestResult};

use crate::config::RestHttpConfig;
use crate::router::PathParams;

/// A routed request handed to a route handler.
#[derive(Debug)]
pub struct RouteRequest {
    /// The HTTP request head.
    pub parts: http::request::Parts,
    /// Placeholders captured by the matched route.
    pub params: PathParams,
    /// The collected request body.
    pub body: Bytes,
    /// Id used to correlate logs and the `x-request-id` header.
    pub request_id: String,
}

/// Look up a query parameter, decoded. The first occurrence wins.
#[must_use]
pub fn query_param(parts: &http::request::Parts, name: &str) -> Option<String> {
    let query = parts.uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Build the initial context of a request.
///
/// - `version` and `resource_id` come from the route placeholders
/// - `limit` falls back to the configured default when missing, zero or unparseable
/// - `cursor` is kept only when non-empty
/// - `format` is lowercased and falls back to the configured default
#[must_use]
pub fn build_context(
    parts: &http::request::Parts,
    params: &PathParams,
    request_id: &str,
    config: &RestHttpConfig,
) -> RequestContext {
    let limit = query_param(parts, "limit")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&l| l > 0)
        .unwrap_or(config.default_limit);

    let format = query_param(parts, "format")
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| config.default_format.clone());

    RequestContext::new(request_id)
        .with_path(parts.uri.path())
        .with_version(params.get(VERSION_KEY).unwrap_or_default())
        .with_resource_id(params.get(RESOURCE_ID_KEY).map(ToOwned::to_owned))
        .with_limit(limit)
        .with_cursor(query_param(parts, "cursor").filter(|c| !c.is_empty()))
        .with_response_format(format)
}

/// Build the context of a routed request.
#[must_use]
pub fn context_from_request(req: &RouteRequest, config: &RestHttpConfig) -> RequestContext {
    build_context(&req.parts, &req.params, &req.request_id, config)
}

/// Decode the first JSON value of a request body as an object.
///
/// `null` decodes to an empty payload and anything after the first value is
/// ignored. An empty body is a decode error.
pub fn decode_payload(body: &[u8]) -> RestResult<Payload> {
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Option<Payload>>();
    match values.next() {
        Some(Ok(payload)) => Ok(payload.unwrap_or_default()),
        Some(Err(e)) => {
            Err(RestError::decode(format!("invalid request body: {e}")).with_source(e))
        }
        None => Err(RestError::decode("invalid request body: empty")),
    }
}
