//! Handler proxy: registration checks and URI defaults.
//!
//! [`HandlerProxy`] wraps a [`ResourceHandler`] and is the only object the
//! HTTP layer talks to. All defaults are computed once, in
//! [`HandlerProxy::new`], so a misconfigured handler fails at registration
//! instead of on its first request.

use std::fmt;
use std::sync::Arc;

use restgate_model::{Payload, RequestContext, Resource, ResourceType, RestError, RestResult};

use crate::handler::ResourceHandler;
use crate::rules::{FieldRulesEngine, Rules, RulesEngine};

/// Route placeholder holding the API version.
pub const VERSION_KEY: &str = "version";

/// Route placeholder holding the resource id.
pub const RESOURCE_ID_KEY: &str = "resource_id";

/// A validated, defaulted view of a [`ResourceHandler`].
#[derive(Clone)]
pub struct HandlerProxy {
    inner: Arc<dyn ResourceHandler>,
    name: String,
    resource_type: Option<ResourceType>,
    rules: Rules,
    engine: Arc<dyn RulesEngine>,
    create_uri: String,
    read_uri: String,
    read_list_uri: String,
    update_uri: String,
    delete_uri: String,
}

impl fmt::Debug for HandlerProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerProxy")
            .field("name", &self.name)
            .field("resource_type", &self.resource_type)
            .field("rules", &self.rules.len())
            .field("create_uri", &self.create_uri)
            .field("read_uri", &self.read_uri)
            .field("read_list_uri", &self.read_list_uri)
            .field("update_uri", &self.update_uri)
            .field("delete_uri", &self.delete_uri)
            .finish_non_exhaustive()
    }
}

impl HandlerProxy {
    /// Wrap a handler.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when the handler has no resource name,
    /// or declares rules without a resource type.
    pub fn new<H: ResourceHandler>(handler: H) -> RestResult<Self> {
        Self::from_arc(Arc::new(handler))
    }

    /// Wrap a shared handler. See [`HandlerProxy::new`].
    pub fn from_arc(inner: Arc<dyn ResourceHandler>) -> RestResult<Self> {
        let name = inner.resource_name().to_owned();
        if name.is_empty() {
            return Err(RestError::configuration(
                "resource handler must provide a resource name",
            ));
        }

        let resource_type = inner.resource_type();
        let rules = inner.rules();
        let rules = match (rules.is_empty(), resource_type) {
            (true, _) => rules,
            (false, Some(ty)) => rules.bind(ty),
            (false, None) => {
                return Err(RestError::configuration(format!(
                    "resource '{name}' declares rules but no resource type"
                )));
            }
        };

        let plural = format!("/api/v{{{VERSION_KEY}}}/{name}");
        let singular = format!("{plural}/{{{RESOURCE_ID_KEY}}}");

        let proxy = Self {
            create_uri: or_default(inner.create_uri(), &plural),
            read_uri: or_default(inner.read_uri(), &singular),
            read_list_uri: or_default(inner.read_list_uri(), &plural),
            update_uri: or_default(inner.update_uri(), &singular),
            delete_uri: or_default(inner.delete_uri(), &singular),
            inner,
            name,
            resource_type,
            rules,
            engine: Arc::new(FieldRulesEngine),
        };

        tracing::debug!(resource = %proxy.name, rules = proxy.rules.len(), "proxied resource handler");
        Ok(proxy)
    }

    /// Replace the rules engine.
    #[must_use]
    pub fn with_rules_engine(mut self, engine: Arc<dyn RulesEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// The resource name. Never empty.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.name
    }

    /// The declared resource type.
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource_type
    }

    /// The handler's rules, each bound to the resource type.
    #[must_use]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// URI template for create.
    #[must_use]
    pub fn create_uri(&self) -> &str {
        &self.create_uri
    }

    /// URI template for read.
    #[must_use]
    pub fn read_uri(&self) -> &str {
        &self.read_uri
    }

    /// URI template for read-list.
    #[must_use]
    pub fn read_list_uri(&self) -> &str {
        &self.read_list_uri
    }

    /// URI template for update.
    #[must_use]
    pub fn update_uri(&self) -> &str {
        &self.update_uri
    }

    /// URI template for delete.
    #[must_use]
    pub fn delete_uri(&self) -> &str {
        &self.delete_uri
    }

    /// Run the handler's authentication.
    pub fn authenticate(&self, parts: &http::request::Parts) -> RestResult<()> {
        self.inner.authenticate(parts)
    }

    /// Apply inbound rules to a decoded payload.
    pub fn validate_payload(&self, payload: Payload, version: &str) -> RestResult<Payload> {
        match self.resource_type {
            Some(ty) if !self.rules.is_empty() => {
                self.engine.apply_inbound(ty, &self.rules, payload, version)
            }
            _ => Ok(payload),
        }
    }

    fn render(&self, resource: Resource, version: &str) -> RestResult<Resource> {
        match self.resource_type {
            Some(ty) if !self.rules.is_empty() => {
                self.engine.apply_outbound(ty, &self.rules, resource, version)
            }
            _ => Ok(resource),
        }
    }

    /// Create a resource.
    pub async fn create_resource(
        &self,
        ctx: &RequestContext,
        data: Payload,
        version: &str,
    ) -> RestResult<Resource> {
        let resource = self.inner.create_resource(ctx, data, version).await?;
        self.render(resource, version)
    }

    /// Read a page of resources.
    pub async fn read_resource_list(
        &self,
        ctx: &RequestContext,
        limit: usize,
        cursor: Option<&str>,
        version: &str,
    ) -> RestResult<(Vec<Resource>, Option<String>)> {
        let (resources, next) = self
            .inner
            .read_resource_list(ctx, limit, cursor, version)
            .await?;
        let resources = resources
            .into_iter()
            .map(|r| self.render(r, version))
            .collect::<RestResult<Vec<_>>>()?;
        Ok((resources, next))
    }

    /// Read a single resource.
    pub async fn read_resource(
        &self,
        ctx: &RequestContext,
        id: &str,
        version: &str,
    ) -> RestResult<Resource> {
        let resource = self.inner.read_resource(ctx, id, version).await?;
        self.render(resource, version)
    }

    /// Update a single resource.
    pub async fn update_resource(
        &self,
        ctx: &RequestContext,
        id: &str,
        data: Payload,
        version: &str,
    ) -> RestResult<Resource> {
        let resource = self.inner.update_resource(ctx, id, data, version).await?;
        self.render(resource, version)
    }

    /// Delete a single resource.
    pub async fn delete_resource(
        &self,
        ctx: &RequestContext,
        id: &str,
        version: &str,
    ) -> RestResult<Resource> {
        let resource = self.inner.delete_resource(ctx, id, version).await?;
        self.render(resource, version)
    }
}

fn or_default(uri: Option<String>, default: &str) -> String {
    uri.filter(|u| !u.is_empty())
        .unwrap_or_else(|| default.to_owned())
}
