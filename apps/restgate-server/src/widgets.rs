//! In-memory widgets resource served by the standalone binary.
//!
//! Widgets live in a [`DashMap`] keyed by a monotonically increasing id. List
//! pages are ordered by id and the cursor is the id of the last widget on the
//! previous page.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use restgate_core::{ResourceHandler, Rule, Rules};
use restgate_model::{Payload, RequestContext, Resource, ResourceType, RestError, RestResult};

/// Header carrying the API key when one is configured.
pub const API_KEY_HEADER: &str = "x-api-key";

/// A stored widget.
#[derive(Debug, Clone, Serialize)]
pub struct Widget {
    /// Decimal id assigned on creation.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional color, exposed from API version 2 on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct WidgetInput {
    name: String,
    #[serde(default)]
    color: Option<String>,
}

/// Resource handler for `widgets`.
#[derive(Debug)]
pub struct WidgetHandler {
    widgets: DashMap<u64, Widget>,
    next_id: AtomicU64,
    api_key: Option<String>,
}

impl Default for WidgetHandler {
    fn default() -> Self {
        Self::new(None)
    }
}

impl WidgetHandler {
    /// Create an empty store. When `api_key` is set, every request must carry
    /// it in the `x-api-key` header.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            widgets: DashMap::new(),
            next_id: AtomicU64::new(1),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Number of stored widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

fn parse_input(data: Payload) -> RestResult<WidgetInput> {
    serde_json::from_value(Resource::Object(data))
        .map_err(|e| RestError::handler(format!("invalid widget: {e}")).with_source(e))
}

fn parse_id(id: &str) -> RestResult<u64> {
    id.parse()
        .map_err(|_| RestError::handler(format!("widget {id} not found")))
}

fn to_resource(widget: &Widget) -> RestResult<Resource> {
    serde_json::to_value(widget)
        .map_err(|e| RestError::handler(format!("failed to render widget: {e}")).with_source(e))
}

#[async_trait]
impl ResourceHandler for WidgetHandler {
    fn resource_name(&self) -> &str {
        "widgets"
    }

    fn resource_type(&self) -> Option<ResourceType> {
        Some(ResourceType::of::<Widget>())
    }

    fn rules(&self) -> Rules {
        Rules::new(vec![
            Rule::new("id"),
            Rule::new("name").required(),
            Rule::new("color").versions(["2"]),
            Rule::new("created_at").output_as("createdAt"),
        ])
    }

    fn authenticate(&self, parts: &http::request::Parts) -> RestResult<()> {
        let Some(expected) = self.api_key.as_deref() else {
            return Ok(());
        };
        match parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(key) if key == expected => Ok(()),
            Some(_) => Err(RestError::unauthorized("invalid API key")),
            None => Err(RestError::unauthorized("missing API key")),
        }
    }

    async fn create_resource(
        &self,
        ctx: &RequestContext,
        data: Payload,
        _version: &str,
    ) -> RestResult<Resource> {
        let input = parse_input(data)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let widget = Widget {
            id: id.to_string(),
            name: input.name,
            color: input.color,
            created_at: Utc::now(),
        };
        let resource = to_resource(&widget)?;
        self.widgets.insert(id, widget);

        tracing::info!(request_id = ctx.request_id(), widget_id = id, "created widget");
        Ok(resource)
    }

    async fn read_resource_list(
        &self,
        _ctx: &RequestContext,
        limit: usize,
        cursor: Option<&str>,
        _version: &str,
    ) -> RestResult<(Vec<Resource>, Option<String>)> {
        let after = cursor
            .map(|c| {
                c.parse::<u64>()
                    .map_err(|_| RestError::handler(format!("invalid cursor: {c}")))
            })
            .transpose()?;

        let mut ids: Vec<u64> = self
            .widgets
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| after.is_none_or(|a| *id > a))
            .collect();
        ids.sort_unstable();

        let has_more = ids.len() > limit;
        ids.truncate(limit);
        let next = if has_more {
            ids.last().map(ToString::to_string)
        } else {
            None
        };

        let page = ids
            .iter()
            .filter_map(|id| self.widgets.get(id).map(|w| to_resource(&w)))
            .collect::<RestResult<Vec<_>>>()?;
        Ok((page, next))
    }

    async fn read_resource(
        &self,
        _ctx: &RequestContext,
        id: &str,
        _version: &str,
    ) -> RestResult<Resource> {
        let key = parse_id(id)?;
        let widget = self
            .widgets
            .get(&key)
            .ok_or_else(|| RestError::handler(format!("widget {id} not found")))?;
        to_resource(&widget)
    }

    async fn update_resource(
        &self,
        ctx: &RequestContext,
        id: &str,
        data: Payload,
        _version: &str,
    ) -> RestResult<Resource> {
        let key = parse_id(id)?;
        let input = parse_input(data)?;
        let mut widget = self
            .widgets
            .get_mut(&key)
            .ok_or_else(|| RestError::handler(format!("widget {id} not found")))?;
        widget.name = input.name;
        widget.color = input.color;

        tracing::info!(request_id = ctx.request_id(), widget_id = key, "updated widget");
        to_resource(&widget)
    }

    async fn delete_resource(
        &self,
        ctx: &RequestContext,
        id: &str,
        _version: &str,
    ) -> RestResult<Resource> {
        let key = parse_id(id)?;
        let (_, widget) = self
            .widgets
            .remove(&key)
            .ok_or_else(|| RestError::handler(format!("widget {id} not found")))?;

        tracing::info!(request_id = ctx.request_id(), widget_id = key, "deleted widget");
        to_resource(&widget)
    }
}
