//! Gateway service in front of the REST routes.
//!
//! Health checks (`GET /health`, `GET /_health`) are answered here with
//! the list of registered resources; every other request is handed to the
//! [`RestHttpService`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use hyper::body::Incoming;
use hyper::service::Service;

use restgate_http::RestHttpService;
use restgate_http::RestResponseBody;
use restgate_http::serializer::{JSON_CONTENT_TYPE, build_response};

/// Gateway that intercepts health checks and serves everything else through
/// the REST service.
#[derive(Debug, Clone)]
pub struct GatewayService {
    rest: RestHttpService,
}

impl GatewayService {
    /// Create a new gateway wrapping the REST service.
    pub fn new(rest: RestHttpService) -> Self {
        Self { rest }
    }

    /// Names of the resources served behind this gateway.
    pub fn resource_names(&self) -> Vec<String> {
        self.rest.api().resources().to_vec()
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<RestResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.method(), req.uri().path()) {
            let resp = health_check_response(&self.resource_names());
            return Box::pin(async { Ok(resp) });
        }

        self.rest.call(req)
    }
}

/// Check if the request is a health check.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

/// Produce the health check response listing the served resources.
fn health_check_response(resources: &[String]) -> http::Response<RestResponseBody> {
    let body = serde_json::json!({
        "status": "running",
        "version": crate::VERSION,
        "resources": resources,
    });
    build_response(
        body.to_string().into_bytes(),
        http::StatusCode::OK,
        JSON_CONTENT_TYPE,
    )
}
