//! Resource handler contract and proxy for restgate.
//!
//! A domain type becomes an HTTP resource by implementing [`ResourceHandler`].
//! Every provided method of the trait is a safe default, so implementors only
//! override the operations they support. Before a handler is routed it is
//! wrapped in a [`HandlerProxy`], which validates the registration, fills in
//! the conventional URIs and binds the handler's [`Rules`] to its resource type.

pub mod handler;
pub mod proxy;
pub mod rules;

pub use handler::ResourceHandler;
pub use proxy::{HandlerProxy, RESOURCE_ID_KEY, VERSION_KEY};
pub use rules::{FieldRulesEngine, Rule, Rules, RulesEngine};
