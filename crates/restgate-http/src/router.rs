//! URI template routing.
//!
//! A template is a `/`-separated path whose segments are either literals or
//! contain one `{name}` placeholder with an optional literal prefix and
//! suffix, e.g. `/api/v{version}/widgets/{resource_id}`. A placeholder
//! captures a non-empty run of characters up to the next `/`; a gorilla-style
//! constraint (`{version:[^/]+}`) is accepted and ignored, since placeholders
//! never span segments anyway.

use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use percent_encoding::percent_decode_str;

use crate::body::RestResponseBody;
use crate::request::RouteRequest;

/// A request-processing function registered for a route.
pub type RouteHandler =
    Arc<dyn Fn(RouteRequest) -> BoxFuture<'static, http::Response<RestResponseBody>> + Send + Sync>;

/// Errors raised while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The template does not start with `/`.
    #[error("URI template must start with '/': {0}")]
    MissingLeadingSlash(String),

    /// A segment has unbalanced or nested braces.
    #[error("malformed placeholder in URI template: {0}")]
    MalformedPlaceholder(String),

    /// A placeholder has no name.
    #[error("empty placeholder name in URI template: {0}")]
    EmptyPlaceholder(String),

    /// The same method and template were registered twice.
    #[error("route already registered: {method} {template}")]
    Duplicate {
        /// HTTP method of the conflicting route.
        method: Method,
        /// Template of the conflicting route.
        template: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param {
        prefix: String,
        name: String,
        suffix: String,
    },
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parse a template.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let Some(path) = raw.strip_prefix('/') else {
            return Err(RouteError::MissingLeadingSlash(raw.to_owned()));
        };

        let segments = split_template(path)
            .into_iter()
            .map(|segment| parse_segment(raw, segment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning the captured placeholders.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param {
                    prefix,
                    name,
                    suffix,
                } => {
                    let value = part.strip_prefix(prefix.as_str())?;
                    let value = value.strip_suffix(suffix.as_str())?;
                    if value.is_empty() {
                        return None;
                    }
                    let decoded = percent_decode_str(value).decode_utf8_lossy();
                    params.0.push((name.clone(), decoded.into_owned()));
                }
            }
        }
        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}

/// Split a template on `/`, ignoring separators inside placeholder braces.
fn split_template(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    if segments.last() == Some(&"") {
        segments.pop();
    }
    segments
}

fn parse_segment(raw: &str, segment: &str) -> Result<Segment, RouteError> {
    let malformed = || RouteError::MalformedPlaceholder(raw.to_owned());

    let Some(open) = segment.find('{') else {
        if segment.contains('}') {
            return Err(malformed());
        }
        return Ok(Segment::Literal(segment.to_owned()));
    };
    let close = segment.rfind('}').ok_or_else(malformed)?;
    if close < open {
        return Err(malformed());
    }

    let inner = &segment[open + 1..close];
    let name = inner.split_once(':').map_or(inner, |(name, _)| name);
    if name.contains('{') || name.contains('}') {
        return Err(malformed());
    }
    if name.is_empty() {
        return Err(RouteError::EmptyPlaceholder(raw.to_owned()));
    }

    let prefix = &segment[..open];
    let suffix = &segment[close + 1..];
    if suffix.contains(['{', '}']) {
        return Err(malformed());
    }

    Ok(Segment::Param {
        prefix: prefix.to_owned(),
        name: name.to_owned(),
        suffix: suffix.to_owned(),
    })
}

/// Placeholder values captured from a request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Route {
    method: Method,
    template: UriTemplate,
    handler: RouteHandler,
}

/// Outcome of resolving a request against the route table.
pub enum RouteMatch<'a> {
    /// A route accepts the request.
    Found(&'a RouteHandler, PathParams),
    /// Some route matches the path, none the method.
    MethodNotAllowed,
    /// No route matches the path.
    NotFound,
}

impl std::fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(_, params) => f.debug_tuple("Found").field(params).finish(),
            Self::MethodNotAllowed => f.write_str("MethodNotAllowed"),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Route table. Built before serving and read-only afterwards.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.routes
                    .iter()
                    .map(|r| format!("{} {}", r.method, r.template.as_str())),
            )
            .finish()
    }
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of routes. Either every route is added or none is.
    pub fn add_all<'a, I>(&mut self, routes: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = (Method, &'a str, RouteHandler)>,
    {
        let mut staged: Vec<Route> = Vec::new();
        for (method, raw, handler) in routes {
            let template = UriTemplate::parse(raw)?;
            let taken = self
                .routes
                .iter()
                .chain(staged.iter())
                .any(|r| r.method == method && r.template == template);
            if taken {
                return Err(RouteError::Duplicate {
                    method,
                    template: raw.to_owned(),
                });
            }
            staged.push(Route {
                method,
                template,
                handler,
            });
        }
        self.routes.extend(staged);
        Ok(())
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a request. Routes are tried in registration order.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut path_matched = false;
        for route in &self.routes {
            if let Some(params) = route.template.matches(path) {
                if route.method == *method {
                    return RouteMatch::Found(&route.handler, params);
                }
                path_matched = true;
            }
        }
        if path_matched {
            RouteMatch::MethodNotAllowed
        } else {
            RouteMatch::NotFound
        }
    }
}
