//! Error types for the protocol layer.
//!
//! A `ProtocolError` means the bytes were the problem: they could not be
//! produced, parsed, or they parsed into something the login protocol does
//! not allow. Network failures live in `eos-transport`.

/// Errors that can occur while encoding or decoding login messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a request into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing required field
    /// such as `success`, or a field of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload parsed but is not a valid login message, e.g. an
    /// unexpected `type` tag or an empty body.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The caller-supplied user id cannot be sent.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The server reported success but sent no user data.
    ///
    /// A successful login without an identity cannot spawn a player, so it
    /// is treated as a protocol violation rather than a success.
    #[error("login succeeded but userData is missing")]
    MissingUserData,
}
