//! The route table of a set of resource handlers.
//!
//! [`RestApi`] is the construction-time registry: every handler registered on
//! it is wrapped in a [`HandlerProxy`] and its five CRUD routes are added to
//! the router. Once serving starts the table is read-only.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;

use restgate_core::{HandlerProxy, ResourceHandler};
use restgate_model::{RestError, RestResult};

use crate::body::RestResponseBody;
use crate::config::RestHttpConfig;
use crate::factory::RequestHandlerFactory;
use crate::request::{RouteRequest, build_context};
use crate::response::ResponseDispatcher;
use crate::router::{PathParams, RouteMatch, Router};
use crate::serializer::SerializerRegistry;

/// Header carrying the id of each request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Registered resources and their routes.
#[derive(Debug)]
pub struct RestApi {
    router: Router,
    dispatcher: ResponseDispatcher,
    config: Arc<RestHttpConfig>,
    resources: Vec<String>,
}

impl Default for RestApi {
    fn default() -> Self {
        Self::new(RestHttpConfig::default())
    }
}

impl RestApi {
    /// Create an empty API rendering JSON only.
    #[must_use]
    pub fn new(config: RestHttpConfig) -> Self {
        Self {
            router: Router::new(),
            dispatcher: ResponseDispatcher::default(),
            config: Arc::new(config),
            resources: Vec::new(),
        }
    }

    /// Replace the serializer registry. Affects routes registered afterwards
    /// as well as routing errors.
    #[must_use]
    pub fn with_serializers(mut self, serializers: SerializerRegistry) -> Self {
        self.dispatcher = ResponseDispatcher::new(serializers);
        self
    }

    /// The HTTP layer configuration.
    #[must_use]
    pub fn config(&self) -> &RestHttpConfig {
        &self.config
    }

    /// Wrap `handler` in a proxy and register its routes.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when the handler is misconfigured or
    /// one of its routes is malformed or already taken. Nothing is registered
    /// in that case.
    pub fn register<H: ResourceHandler>(&mut self, handler: H) -> RestResult<()> {
        self.register_proxy(HandlerProxy::new(handler)?)
    }

    /// Register the routes of an already built proxy.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when a route is malformed or already
    /// taken.
    pub fn register_proxy(&mut self, proxy: HandlerProxy) -> RestResult<()> {
        let name = proxy.resource_name().to_owned();
        let factory = RequestHandlerFactory::new(
            Arc::new(proxy),
            self.dispatcher.clone(),
            Arc::clone(&self.config),
        );

        self.router
            .add_all(factory.routes())
            .map_err(|e| RestError::configuration(format!("resource {name}: {e}")).with_source(e))?;

        tracing::info!(
            resource = %name,
            routes = self.router.len(),
            formats = ?self.dispatcher.formats(),
            "registered resource handler",
        );
        self.resources.push(name);
        Ok(())
    }

    /// Names of the registered resources, in registration order.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Route a request and produce its response.
    pub async fn handle(&self, req: http::Request<Bytes>) -> http::Response<RestResponseBody> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (parts, body) = req.into_parts();

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            path = parts.uri.path(),
            "routing request",
        );

        let response = match self.router.resolve(&parts.method, parts.uri.path()) {
            RouteMatch::Found(handler, params) => {
                handler(RouteRequest {
                    parts,
                    params,
                    body,
                    request_id: request_id.clone(),
                })
                .await
            }
            RouteMatch::MethodNotAllowed => {
                let err = RestError::method_not_allowed(&parts.method, parts.uri.path());
                self.reject_with_id(&parts, &request_id, err, StatusCode::METHOD_NOT_ALLOWED)
            }
            RouteMatch::NotFound => {
                let err = RestError::not_found(parts.uri.path());
                self.reject_with_id(&parts, &request_id, err, StatusCode::NOT_FOUND)
            }
        };

        with_request_id(response, &request_id)
    }

    /// Respond to a request that failed before routing, e.g. because its body
    /// could not be read.
    #[must_use]
    pub fn reject(
        &self,
        parts: &http::request::Parts,
        error: RestError,
        status: StatusCode,
    ) -> http::Response<RestResponseBody> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = self.reject_with_id(parts, &request_id, error, status);
        with_request_id(response, &request_id)
    }

    fn reject_with_id(
        &self,
        parts: &http::request::Parts,
        request_id: &str,
        error: RestError,
        status: StatusCode,
    ) -> http::Response<RestResponseBody> {
        let ctx = build_context(parts, &PathParams::default(), request_id, &self.config)
            .with_error(Some(error))
            .with_status(status);
        self.dispatcher.send_response(&ctx)
    }
}

fn with_request_id(
    mut response: http::Response<RestResponseBody>,
    request_id: &str,
) -> http::Response<RestResponseBody> {
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }
    response
}
