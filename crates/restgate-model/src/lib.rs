//! Model types for restgate.
//!
//! This crate holds the values that flow through the dispatch pipeline:
//!
//! - [`Resource`] and [`Payload`]: the opaque domain value and the decoded request body
//! - [`ResourceType`]: explicit type descriptor used to tag rules
//! - [`RequestContext`]: immutable per-request state
//! - [`RestError`]: the error type shared by every pipeline stage

pub mod context;
pub mod error;
pub mod types;

pub use context::RequestContext;
pub use error::{RestError, RestErrorCode, RestResult};
pub use types::{Payload, Resource, ResourceType};
