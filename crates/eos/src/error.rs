//! Unified error type for the EOS client.

use eos_protocol::ProtocolError;
use eos_session::SessionError;
use eos_transport::TransportError;
use eos_world::WorldError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum EosError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    World(#[from] WorldError),

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),
}
