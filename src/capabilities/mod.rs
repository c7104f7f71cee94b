//! Capability modules bound into every engine.
//!
//! A capability exposes a single `register` entrypoint. The session
//! bootstrap calls it once per engine, in the order returned by
//! [`default_capabilities`], and waits for it before accepting traffic.

pub mod echo;
pub mod workout_plan;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::EngineError;
use crate::protocol::engine::{Engine, ToolError};

/// A unit of business functionality registered into an engine.
pub trait Capability: Send + Sync {
    /// Stable name used in logs and bootstrap errors.
    fn name(&self) -> &'static str;

    /// Bind this capability's tools into `engine`.
    fn register<'a>(&'a self, engine: &'a mut Engine) -> BoxFuture<'a, Result<(), EngineError>>;
}

/// The capabilities served by this binary, in registration order.
pub fn default_capabilities() -> Vec<Arc<dyn Capability>> {
    vec![
        Arc::new(echo::Echo),
        Arc::new(workout_plan::WorkoutPlan),
    ]
}

/// Decode tool arguments, mapping failures to [`ToolError::InvalidArguments`].
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
