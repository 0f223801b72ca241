//! Field rules and the engine that evaluates them.
//!
//! A [`Rule`] describes one field of a resource: whether inbound payloads must
//! carry it, the name it is rendered under, and which API versions it applies
//! to. Rules are bound to a [`ResourceType`] when the owning handler is proxied
//! and are never rebound afterwards.

use std::fmt;

use restgate_model::{Payload, Resource, ResourceType, RestError, RestResult};

/// A rule for a single resource field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    field: String,
    output_as: Option<String>,
    required: bool,
    versions: Vec<String>,
    resource_type: Option<ResourceType>,
}

impl Rule {
    /// Rule for `field`: optional, unrenamed, applied to every version.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            output_as: None,
            required: false,
            versions: Vec::new(),
            resource_type: None,
        }
    }

    /// Inbound payloads must contain this field.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Render the field under another name in responses.
    #[must_use]
    pub fn output_as(mut self, name: impl Into<String>) -> Self {
        self.output_as = Some(name.into());
        self
    }

    /// Restrict the rule to the given API versions.
    #[must_use]
    pub fn versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Field name in payloads and resources.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Name the field is rendered under.
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.output_as.as_deref().unwrap_or(&self.field)
    }

    /// Whether inbound payloads must contain the field.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the rule applies to `version`.
    #[must_use]
    pub fn applies_to(&self, version: &str) -> bool {
        self.versions.is_empty() || self.versions.iter().any(|v| v == version)
    }

    /// Resource type the rule is bound to, once proxied.
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource_type
    }

    pub(crate) fn bind(self, resource_type: ResourceType) -> Self {
        Self {
            resource_type: Some(resource_type),
            ..self
        }
    }
}

/// An ordered set of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules(Vec<Rule>);

impl Rules {
    /// Create a rule set.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    /// Whether the set has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over all rules.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    /// Iterate over the rules that apply to `version`.
    pub fn applicable<'a>(&'a self, version: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.0.iter().filter(move |r| r.applies_to(version))
    }

    pub(crate) fn bind(self, resource_type: ResourceType) -> Self {
        Self(self.0.into_iter().map(|r| r.bind(resource_type)).collect())
    }
}

impl FromIterator<Rule> for Rules {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Rules {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Evaluates bound rules against payloads and resources.
pub trait RulesEngine: Send + Sync + fmt::Debug {
    /// Validate or transform an inbound payload before it reaches the handler.
    fn apply_inbound(
        &self,
        resource_type: ResourceType,
        rules: &Rules,
        payload: Payload,
        version: &str,
    ) -> RestResult<Payload>;

    /// Transform a resource returned by the handler before it is serialized.
    fn apply_outbound(
        &self,
        resource_type: ResourceType,
        rules: &Rules,
        resource: Resource,
        version: &str,
    ) -> RestResult<Resource>;
}

/// Default engine: enforces required fields on the way in and projects
/// resources onto their rule fields on the way out.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRulesEngine;

impl FieldRulesEngine {
    fn check_binding(resource_type: ResourceType, rules: &Rules) -> RestResult<()> {
        match rules.iter().find(|r| r.resource_type() != Some(resource_type)) {
            Some(rule) => Err(RestError::configuration(format!(
                "rule for field '{}' is not bound to {resource_type}",
                rule.field()
            ))),
            None => Ok(()),
        }
    }

    fn project(rules: &Rules, resource: Resource, version: &str) -> Resource {
        match resource {
            Resource::Object(mut fields) => {
                let mut projected = serde_json::Map::new();
                for rule in rules.applicable(version) {
                    if let Some(value) = fields.remove(rule.field()) {
                        projected.insert(rule.output_name().to_owned(), value);
                    }
                }
                Resource::Object(projected)
            }
            Resource::Array(items) => Resource::Array(
                items
                    .into_iter()
                    .map(|item| Self::project(rules, item, version))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl RulesEngine for FieldRulesEngine {
    fn apply_inbound(
        &self,
        resource_type: ResourceType,
        rules: &Rules,
        payload: Payload,
        version: &str,
    ) -> RestResult<Payload> {
        Self::check_binding(resource_type, rules)?;

        let missing: Vec<&str> = rules
            .applicable(version)
            .filter(|r| r.is_required() && !payload.contains_key(r.field()))
            .map(Rule::field)
            .collect();
        if !missing.is_empty() {
            return Err(RestError::validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        Ok(payload)
    }

    fn apply_outbound(
        &self,
        resource_type: ResourceType,
        rules: &Rules,
        resource: Resource,
        version: &str,
    ) -> RestResult<Resource> {
        Self::check_binding(resource_type, rules)?;
        Ok(Self::project(rules, resource, version))
    }
}
