//! HTTP layer configuration.
//!
//! Values are loaded from environment variables via [`RestHttpConfig::from_env`].

use restgate_model::context::{DEFAULT_FORMAT, DEFAULT_LIMIT};
use typed_builder::TypedBuilder;

/// Configuration for the restgate HTTP layer.
///
/// # Examples
///
/// ```
/// use restgate_http::RestHttpConfig;
///
/// let config = RestHttpConfig::builder().default_limit(25).build();
/// assert_eq!(config.default_limit, 25);
/// assert_eq!(config.default_format, "json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct RestHttpConfig {
    /// Page size used when a list request carries no valid `limit`.
    #[builder(default = DEFAULT_LIMIT)]
    pub default_limit: usize,

    /// Format used when a request carries no `format` query parameter.
    #[builder(default = String::from(DEFAULT_FORMAT), setter(into))]
    pub default_format: String,

    /// Largest accepted request body, in bytes.
    #[builder(default = 1_048_576)]
    pub max_body_size: usize,
}

impl Default for RestHttpConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RestHttpConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `RESTGATE_DEFAULT_LIMIT` | `100` |
    /// | `RESTGATE_DEFAULT_FORMAT` | `json` |
    /// | `RESTGATE_MAX_BODY_SIZE` | `1048576` |
    ///
    /// Unparseable numbers and a zero limit keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let number = |name: &str| -> Option<usize> { lookup(name)?.trim().parse().ok() };

        if let Some(v) = number("RESTGATE_DEFAULT_LIMIT").filter(|v| *v > 0) {
            config.default_limit = v;
        }
        if let Some(v) = lookup("RESTGATE_DEFAULT_FORMAT").filter(|v| !v.trim().is_empty()) {
            config.default_format = v.trim().to_lowercase();
        }
        if let Some(v) = number("RESTGATE_MAX_BODY_SIZE") {
            config.max_body_size = v;
        }

        config
    }
}
