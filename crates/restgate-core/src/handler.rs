//! The resource handler contract.

use async_trait::async_trait;

use restgate_model::{Payload, RequestContext, Resource, ResourceType, RestError, RestResult};

use crate::rules::Rules;

/// Business logic behind a REST resource.
///
/// Only [`resource_name`](ResourceHandler::resource_name) must be provided.
/// Everything else has a default: no custom URIs, no rules, every request
/// authorized, and every CRUD operation failing with a `NotImplemented` error.
///
/// ```
/// use async_trait::async_trait;
/// use restgate_core::ResourceHandler;
/// use restgate_model::{Payload, RequestContext, Resource, RestResult};
///
/// struct Widgets;
///
/// #[async_trait]
/// impl ResourceHandler for Widgets {
///     fn resource_name(&self) -> &str {
///         "widgets"
///     }
///
///     async fn create_resource(
///         &self,
///         _ctx: &RequestContext,
///         data: Payload,
///         _version: &str,
///     ) -> RestResult<Resource> {
///         Ok(Resource::Object(data))
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    /// Name of the resource, used to build the default URIs.
    fn resource_name(&self) -> &str;

    /// URI template for create. `None` uses `/api/v{version}/{name}`.
    fn create_uri(&self) -> Option<String> {
        None
    }

    /// URI template for read. `None` uses `/api/v{version}/{name}/{resource_id}`.
    fn read_uri(&self) -> Option<String> {
        None
    }

    /// URI template for read-list. `None` uses `/api/v{version}/{name}`.
    fn read_list_uri(&self) -> Option<String> {
        None
    }

    /// URI template for update. `None` uses `/api/v{version}/{name}/{resource_id}`.
    fn update_uri(&self) -> Option<String> {
        None
    }

    /// URI template for delete. `None` uses `/api/v{version}/{name}/{resource_id}`.
    fn delete_uri(&self) -> Option<String> {
        None
    }

    /// Type descriptor of the served resource. Required when
    /// [`rules`](ResourceHandler::rules) is non-empty.
    fn resource_type(&self) -> Option<ResourceType> {
        None
    }

    /// Create a resource from the decoded payload.
    async fn create_resource(
        &self,
        _ctx: &RequestContext,
        _data: Payload,
        _version: &str,
    ) -> RestResult<Resource> {
        Err(RestError::not_implemented("create_resource"))
    }

    /// Read a page of resources. Returns the page and the cursor of the next
    /// page, if there is one.
    async fn read_resource_list(
        &self,
        _ctx: &RequestContext,
        _limit: usize,
        _cursor: Option<&str>,
        _version: &str,
    ) -> RestResult<(Vec<Resource>, Option<String>)> {
        Err(RestError::not_implemented("read_resource_list"))
    }

    /// Read a single resource.
    async fn read_resource(
        &self,
        _ctx: &RequestContext,
        _id: &str,
        _version: &str,
    ) -> RestResult<Resource> {
        Err(RestError::not_implemented("read_resource"))
    }

    /// Update a single resource from the decoded payload.
    async fn update_resource(
        &self,
        _ctx: &RequestContext,
        _id: &str,
        _data: Payload,
        _version: &str,
    ) -> RestResult<Resource> {
        Err(RestError::not_implemented("update_resource"))
    }

    /// Delete a single resource, returning the deleted value.
    async fn delete_resource(
        &self,
        _ctx: &RequestContext,
        _id: &str,
        _version: &str,
    ) -> RestResult<Resource> {
        Err(RestError::not_implemented("delete_resource"))
    }

    /// Decide whether the request may proceed. All requests are permitted by
    /// default.
    fn authenticate(&self, _parts: &http::request::Parts) -> RestResult<()> {
        Ok(())
    }

    /// Field rules applied to inbound payloads and outbound resources.
    fn rules(&self) -> Rules {
        Rules::default()
    }
}
