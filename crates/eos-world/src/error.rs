//! Error types for the world layer.

use std::time::Duration;

use eos_session::EntityHandle;

/// Errors raised on the privileged context.
///
/// None of these stop the frame loop. A binding that times out is logged
/// and the entity keeps running without its label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The entity's label never became available.
    #[error("label for {entity} not ready after {timeout:?}")]
    BindingTimedOut {
        entity: EntityHandle,
        timeout: Duration,
    },
}
