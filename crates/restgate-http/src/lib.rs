//! HTTP layer for restgate.
//!
//! This crate turns proxied resource handlers into HTTP endpoints:
//!
//! - **Router**: matches `(method, path)` against URI templates
//! - **Request**: builds a [`RequestContext`](restgate_model::RequestContext) and decodes payloads
//! - **Factory**: one request-processing function per CRUD verb
//! - **Response**: serializer registry and the status/error reconciliation
//! - **Service**: hyper `Service` implementation over a [`RestApi`]

pub mod api;
pub mod body;
pub mod config;
pub mod factory;
pub mod request;
pub mod response;
pub mod router;
pub mod serializer;
pub mod service;

pub use api::RestApi;
pub use body::RestResponseBody;
pub use config::RestHttpConfig;
pub use factory::RequestHandlerFactory;
pub use response::ResponseDispatcher;
pub use serializer::{JsonSerializer, ResponseSerializer, SerializerRegistry};
pub use service::RestHttpService;
