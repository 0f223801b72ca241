//! Resource-level type definitions.

use std::any::TypeId;
use std::fmt;

/// A domain value returned by handler operations.
///
/// The pipeline never looks inside a resource; it only hands it to the
/// selected serializer.
pub type Resource = serde_json::Value;

/// A decoded request body: a JSON object, passed to handlers untouched.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Explicit descriptor of the Rust type a resource handler serves.
///
/// Rules are stamped with this descriptor when a handler is proxied, so a rule
/// engine always knows which type it is validating.
///
/// ```
/// use restgate_model::ResourceType;
///
/// struct Widget;
///
/// let ty = ResourceType::of::<Widget>();
/// assert!(ty.is::<Widget>());
/// assert!(ty.name().ends_with("Widget"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceType {
    id: TypeId,
    name: &'static str,
}

impl ResourceType {
    /// Descriptor for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Whether this descriptor was built for `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Fully-qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
