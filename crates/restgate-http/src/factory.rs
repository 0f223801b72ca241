//! Per-verb request handler factories.
//!
//! Each factory turns an operation function into a [`RouteHandler`]. The
//! produced handler builds a [`RequestContext`], authenticates the request,
//! decodes and validates the body (create/update), invokes the operation,
//! records the outcome, and hands the context to the [`ResponseDispatcher`].
//!
//! The success status of a verb is recorded even when the operation failed;
//! reconciling it with the error is the dispatcher's job.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use http::{Method, StatusCode};

use restgate_core::HandlerProxy;
use restgate_model::{Payload, RequestContext, Resource, RestError, RestResult};

use crate::body::RestResponseBody;
use crate::config::RestHttpConfig;
use crate::request::{RouteRequest, context_from_request, decode_payload};
use crate::response::ResponseDispatcher;
use crate::router::RouteHandler;

/// Create operation: `(ctx, payload, version)`.
pub type CreateFn =
    Arc<dyn Fn(RequestContext, Payload, String) -> BoxFuture<'static, RestResult<Resource>> + Send + Sync>;

/// Read-list operation: `(ctx, limit, cursor, version)`, returning the page and
/// the next cursor.
pub type ReadListFn = Arc<
    dyn Fn(
            RequestContext,
            usize,
            Option<String>,
            String,
        ) -> BoxFuture<'static, RestResult<(Vec<Resource>, Option<String>)>>
        + Send
        + Sync,
>;

/// Read or delete operation: `(ctx, id, version)`.
pub type ResourceFn =
    Arc<dyn Fn(RequestContext, String, String) -> BoxFuture<'static, RestResult<Resource>> + Send + Sync>;

/// Update operation: `(ctx, id, payload, version)`.
pub type UpdateFn = Arc<
    dyn Fn(RequestContext, String, Payload, String) -> BoxFuture<'static, RestResult<Resource>>
        + Send
        + Sync,
>;

/// Builds the route handlers of one proxied resource.
#[derive(Debug, Clone)]
pub struct RequestHandlerFactory {
    proxy: Arc<HandlerProxy>,
    dispatcher: ResponseDispatcher,
    config: Arc<RestHttpConfig>,
}

impl RequestHandlerFactory {
    /// Create a factory for `proxy`.
    #[must_use]
    pub fn new(
        proxy: Arc<HandlerProxy>,
        dispatcher: ResponseDispatcher,
        config: Arc<RestHttpConfig>,
    ) -> Self {
        Self {
            proxy,
            dispatcher,
            config,
        }
    }

    /// The five CRUD routes of the proxied resource, wired to its operations.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, &str, RouteHandler)> {
        let proxy = &self.proxy;
        vec![
            (
                Method::POST,
                proxy.create_uri(),
                self.handle_create(proxy_create(proxy)),
            ),
            (
                Method::GET,
                proxy.read_list_uri(),
                self.handle_read_list(proxy_read_list(proxy)),
            ),
            (
                Method::GET,
                proxy.read_uri(),
                self.handle_read(proxy_read(proxy)),
            ),
            (
                Method::PUT,
                proxy.update_uri(),
                self.handle_update(proxy_update(proxy)),
            ),
            (
                Method::DELETE,
                proxy.delete_uri(),
                self.handle_delete(proxy_delete(proxy)),
            ),
        ]
    }

    /// Handler that decodes the body and passes it to `create_fn`.
    /// Success status: 201.
    #[must_use]
    pub fn handle_create(&self, create_fn: CreateFn) -> RouteHandler {
        let factory = self.clone();
        Arc::new(move |req: RouteRequest| {
            let factory = factory.clone();
            let create_fn = Arc::clone(&create_fn);
            async move {
                let ctx = match factory.prepare(&req, true) {
                    Ok((ctx, data)) => {
                        let version = ctx.version().to_owned();
                        let (resource, err) = split(create_fn(ctx.clone(), data, version).await);
                        ctx.with_result(resource)
                            .with_status(StatusCode::CREATED)
                            .with_error(err)
                    }
                    Err(ctx) => ctx,
                };
                factory.finish("create", &ctx)
            }
            .boxed()
        })
    }

    /// Handler that passes the page size and cursor to `read_list_fn`.
    /// Success status: 200.
    #[must_use]
    pub fn handle_read_list(&self, read_list_fn: ReadListFn) -> RouteHandler {
        let factory = self.clone();
        Arc::new(move |req: RouteRequest| {
            let factory = factory.clone();
            let read_list_fn = Arc::clone(&read_list_fn);
            async move {
                let ctx = match factory.prepare(&req, false) {
                    Ok((ctx, _)) => {
                        let limit = ctx.limit();
                        let cursor = ctx.cursor().map(ToOwned::to_owned);
                        let version = ctx.version().to_owned();
                        let (page, err) =
                            split(read_list_fn(ctx.clone(), limit, cursor, version).await);
                        let (resources, next) = match page {
                            Some((resources, next)) => (Some(Resource::Array(resources)), next),
                            None => (None, None),
                        };
                        ctx.with_result(resources)
                            .with_next_cursor(next)
                            .with_error(err)
                            .with_status(StatusCode::OK)
                    }
                    Err(ctx) => ctx,
                };
                factory.finish("read_list", &ctx)
            }
            .boxed()
        })
    }

    /// Handler that passes the resource id to `read_fn`. Success status: 200.
    #[must_use]
    pub fn handle_read(&self, read_fn: ResourceFn) -> RouteHandler {
        self.handle_by_id("read", read_fn)
    }

    /// Handler that decodes the body and passes it with the resource id to
    /// `update_fn`. Success status: 200.
    #[must_use]
    pub fn handle_update(&self, update_fn: UpdateFn) -> RouteHandler {
        let factory = self.clone();
        Arc::new(move |req: RouteRequest| {
            let factory = factory.clone();
            let update_fn = Arc::clone(&update_fn);
            async move {
                let ctx = match factory.prepare(&req, true) {
                    Ok((ctx, data)) => {
                        let id = ctx.resource_id().unwrap_or_default().to_owned();
                        let version = ctx.version().to_owned();
                        let (resource, err) =
                            split(update_fn(ctx.clone(), id, data, version).await);
                        ctx.with_result(resource)
                            .with_error(err)
                            .with_status(StatusCode::OK)
                    }
                    Err(ctx) => ctx,
                };
                factory.finish("update", &ctx)
            }
            .boxed()
        })
    }

    /// Handler that passes the resource id to `delete_fn`. Success status: 200.
    #[must_use]
    pub fn handle_delete(&self, delete_fn: ResourceFn) -> RouteHandler {
        self.handle_by_id("delete", delete_fn)
    }

    fn handle_by_id(&self, verb: &'static str, op: ResourceFn) -> RouteHandler {
        let factory = self.clone();
        Arc::new(move |req: RouteRequest| {
            let factory = factory.clone();
            let op = Arc::clone(&op);
            async move {
                let ctx = match factory.prepare(&req, false) {
                    Ok((ctx, _)) => {
                        let id = ctx.resource_id().unwrap_or_default().to_owned();
                        let version = ctx.version().to_owned();
                        let (resource, err) = split(op(ctx.clone(), id, version).await);
                        ctx.with_result(resource)
                            .with_error(err)
                            .with_status(StatusCode::OK)
                    }
                    Err(ctx) => ctx,
                };
                factory.finish(verb, &ctx)
            }
            .boxed()
        })
    }

    /// Build the context, authenticate, and (when `with_body`) decode and
    /// validate the payload. On failure the returned context carries the
    /// error and status and the operation must not run.
    fn prepare(
        &self,
        req: &RouteRequest,
        with_body: bool,
    ) -> Result<(RequestContext, Payload), RequestContext> {
        let ctx = context_from_request(req, &self.config);

        if let Err(err) = self.proxy.authenticate(&req.parts) {
            tracing::warn!(
                request_id = ctx.request_id(),
                resource = self.proxy.resource_name(),
                error = %err,
                "request rejected by authentication",
            );
            return Err(ctx
                .with_error(Some(err))
                .with_status(StatusCode::UNAUTHORIZED));
        }

        if !with_body {
            return Ok((ctx, Payload::new()));
        }

        let data = match decode_payload(&req.body) {
            Ok(data) => data,
            Err(err) => {
                return Err(ctx
                    .with_error(Some(err))
                    .with_status(StatusCode::INTERNAL_SERVER_ERROR));
            }
        };

        match self.proxy.validate_payload(data, ctx.version()) {
            Ok(data) => Ok((ctx, data)),
            Err(err) => {
                let status = err.code.default_status_code();
                Err(ctx.with_error(Some(err)).with_status(status))
            }
        }
    }

    fn finish(&self, verb: &'static str, ctx: &RequestContext) -> http::Response<RestResponseBody> {
        tracing::debug!(
            request_id = ctx.request_id(),
            resource = self.proxy.resource_name(),
            verb,
            version = ctx.version(),
            failed = ctx.error().is_some(),
            "handled resource request",
        );
        self.dispatcher.send_response(ctx)
    }
}

fn split<T>(result: RestResult<T>) -> (Option<T>, Option<RestError>) {
    match result {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    }
}

fn proxy_create(proxy: &Arc<HandlerProxy>) -> CreateFn {
    let proxy = Arc::clone(proxy);
    Arc::new(move |ctx: RequestContext, data: Payload, version: String| {
        let proxy = Arc::clone(&proxy);
        async move { proxy.create_resource(&ctx, data, &version).await }.boxed()
    })
}

fn proxy_read_list(proxy: &Arc<HandlerProxy>) -> ReadListFn {
    let proxy = Arc::clone(proxy);
    Arc::new(
        move |ctx: RequestContext, limit: usize, cursor: Option<String>, version: String| {
            let proxy = Arc::clone(&proxy);
            async move {
                proxy
                    .read_resource_list(&ctx, limit, cursor.as_deref(), &version)
                    .await
            }
            .boxed()
        },
    )
}

fn proxy_read(proxy: &Arc<HandlerProxy>) -> ResourceFn {
    let proxy = Arc::clone(proxy);
    Arc::new(move |ctx: RequestContext, id: String, version: String| {
        let proxy = Arc::clone(&proxy);
        async move { proxy.read_resource(&ctx, &id, &version).await }.boxed()
    })
}

fn proxy_update(proxy: &Arc<HandlerProxy>) -> UpdateFn {
    let proxy = Arc::clone(proxy);
    Arc::new(
        move |ctx: RequestContext, id: String, data: Payload, version: String| {
            let proxy = Arc::clone(&proxy);
            async move { proxy.update_resource(&ctx, &id, data, &version).await }.boxed()
        },
    )
}

fn proxy_delete(proxy: &Arc<HandlerProxy>) -> ResourceFn {
    let proxy = Arc::clone(proxy);
    Arc::new(move |ctx: RequestContext, id: String, version: String| {
        let proxy = Arc::clone(&proxy);
        async move { proxy.delete_resource(&ctx, &id, &version).await }.boxed()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use restgate_core::{ResourceHandler, Rule, Rules};
    use restgate_model::{ResourceType, RestErrorCode};
    use serde_json::json;

    use super::*;
    use crate::router::UriTemplate;

    struct Widget;

    struct Widgets;

    impl ResourceHandler for Widgets {
        fn resource_name(&self) -> &str {
            "widgets"
        }
    }

    struct Locked;

    impl ResourceHandler for Locked {
        fn resource_name(&self) -> &str {
            "locked"
        }

        fn authenticate(&self, parts: &http::request::Parts) -> RestResult<()> {
            match parts.headers.get(http::header::AUTHORIZATION) {
                Some(_) => Ok(()),
                None => Err(RestError::unauthorized("missing credentials")),
            }
        }
    }

    struct Strict;

    #[async_trait]
    impl ResourceHandler for Strict {
        fn resource_name(&self) -> &str {
            "strict"
        }

        fn resource_type(&self) -> Option<ResourceType> {
            Some(ResourceType::of::<Widget>())
        }

        fn rules(&self) -> Rules {
            Rules::new(vec![Rule::new("name").required()])
        }
    }

    fn factory_for<H: ResourceHandler>(handler: H) -> RequestHandlerFactory {
        RequestHandlerFactory::new(
            Arc::new(HandlerProxy::new(handler).unwrap()),
            ResponseDispatcher::default(),
            Arc::new(RestHttpConfig::default()),
        )
    }

    fn request(method: Method, template: &str, uri: &str, body: &str) -> RouteRequest {
        let path = uri.split('?').next().unwrap();
        let params = UriTemplate::parse(template).unwrap().matches(path).unwrap();
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        RouteRequest {
            parts,
            params,
            body: Bytes::from(body.to_owned()),
            request_id: "req-test".to_owned(),
        }
    }

    fn counting_create(calls: &Arc<AtomicUsize>, result: RestResult<Resource>) -> CreateFn {
        let calls = Arc::clone(calls);
        Arc::new(move |_ctx: RequestContext, _data: Payload, _version: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            let result = result.clone();
            async move { result }.boxed()
        })
    }

    fn body_json(resp: &http::Response<RestResponseBody>) -> serde_json::Value {
        serde_json::from_slice(resp.body().as_bytes()).unwrap()
    }

    const PLURAL: &str = "/api/v{version}/widgets";
    const SINGULAR: &str = "/api/v{version}/widgets/{resource_id}";

    #[tokio::test]
    async fn test_should_not_invoke_create_on_invalid_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = factory_for(Widgets).handle_create(counting_create(&calls, Ok(json!({}))));

        let resp = handler(request(Method::POST, PLURAL, "/api/v1/widgets", "{nope")).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&resp)["error"]["kind"], "Decode");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_not_invoke_update_on_invalid_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let update: UpdateFn = Arc::new(
            move |_ctx: RequestContext, _id: String, _data: Payload, _version: String| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!({})) }.boxed()
            },
        );
        let handler = factory_for(Widgets).handle_update(update);

        let resp = handler(request(Method::PUT, SINGULAR, "/api/v1/widgets/1", "[1]")).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&resp)["error"]["kind"], "Decode");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_invoke_create_with_empty_payload_for_null_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = factory_for(Widgets).handle_create(counting_create(&calls, Ok(json!({}))));

        let resp = handler(request(Method::POST, PLURAL, "/api/v1/widgets", "null")).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_respond_created_with_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let created = json!({"id": "1", "name": "foo"});
        let handler =
            factory_for(Widgets).handle_create(counting_create(&calls, Ok(created.clone())));

        let resp = handler(request(
            Method::POST,
            PLURAL,
            "/api/v1/widgets",
            r#"{"name":"foo"}"#,
        ))
        .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(&resp), json!({"data": created}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_escalate_create_error_to_internal_server_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = factory_for(Widgets)
            .handle_create(counting_create(&calls, Err(RestError::handler("db down"))));

        let resp = handler(request(Method::POST, PLURAL, "/api/v1/widgets", "{}")).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&resp),
            json!({"error": {"kind": "Handler", "message": "db down"}})
        );
    }

    #[tokio::test]
    async fn test_should_answer_not_implemented_for_unknown_format() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = factory_for(Widgets).handle_create(counting_create(&calls, Ok(json!({}))));

        let resp = handler(request(
            Method::POST,
            PLURAL,
            "/api/v1/widgets?format=xml",
            "{}",
        ))
        .await;

        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_json(&resp)["error"]["kind"], "UnsupportedFormat");
    }

    #[tokio::test]
    async fn test_should_pass_limit_and_cursor_and_report_next() {
        let read_list: ReadListFn = Arc::new(
            |_ctx: RequestContext, limit: usize, cursor: Option<String>, version: String| {
                async move {
                    assert_eq!(limit, 2);
                    assert_eq!(version, "1");
                    let next = match cursor.as_deref() {
                        None => Some("2".to_owned()),
                        Some(_) => None,
                    };
                    Ok((vec![json!({"id": "a"}), json!({"id": "b"})], next))
                }
                .boxed()
            },
        );
        let handler = factory_for(Widgets).handle_read_list(read_list);

        let first = handler(request(Method::GET, PLURAL, "/api/v1/widgets?limit=2", "")).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_json(&first)["next"], "2");
        assert_eq!(body_json(&first)["data"][1]["id"], "b");
        assert!(first.headers().contains_key(http::header::LINK));

        let last = handler(request(
            Method::GET,
            PLURAL,
            "/api/v1/widgets?limit=2&cursor=2",
            "",
        ))
        .await;
        assert_eq!(last.status(), StatusCode::OK);
        assert!(body_json(&last).get("next").is_none());
        assert!(!last.headers().contains_key(http::header::LINK));
    }

    #[tokio::test]
    async fn test_should_pass_resource_id_and_version_to_read() {
        let read: ResourceFn = Arc::new(|_ctx: RequestContext, id: String, version: String| {
            async move { Ok(json!({"id": id, "version": version})) }.boxed()
        });
        let handler = factory_for(Widgets).handle_read(read);

        let resp = handler(request(Method::GET, SINGULAR, "/api/v7/widgets/42", "")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(&resp),
            json!({"data": {"id": "42", "version": "7"}})
        );
    }

    #[tokio::test]
    async fn test_should_escalate_delete_error() {
        let delete: ResourceFn = Arc::new(|_ctx: RequestContext, id: String, _version: String| {
            async move { Err(RestError::handler(format!("widget {id} not found"))) }.boxed()
        });
        let handler = factory_for(Widgets).handle_delete(delete);

        let resp = handler(request(Method::DELETE, SINGULAR, "/api/v1/widgets/9", "")).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&resp)["error"]["message"], "widget 9 not found");
    }

    #[tokio::test]
    async fn test_should_reject_unauthenticated_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = factory_for(Locked).handle_create(counting_create(&calls, Ok(json!({}))));

        let resp = handler(request(Method::POST, PLURAL, "/api/v1/widgets", "{}")).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(&resp)["error"]["kind"], "Unauthorized");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_reject_payload_failing_rules() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = factory_for(Strict).handle_create(counting_create(&calls, Ok(json!({}))));

        let resp = handler(request(Method::POST, PLURAL, "/api/v1/widgets", "{}")).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(&resp)["error"]["kind"],
            RestErrorCode::Validation.as_str()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_should_surface_stub_as_internal_server_error() {
        let factory = factory_for(Widgets);
        let routes = factory.routes();
        let (_, template, handler) = routes
            .iter()
            .find(|(m, _, _)| *m == Method::POST)
            .unwrap();

        let resp = handler(request(Method::POST, template, "/api/v1/widgets", "{}")).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&resp)["error"]["kind"], "NotImplemented");
    }
}
