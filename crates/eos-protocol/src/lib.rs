//! Login wire protocol for the EOS client.
//!
//! This crate defines what the client and the login service say to each
//! other:
//!
//! - **Types** ([`Credentials`], [`LoginRequest`], [`LoginResponse`],
//!   [`Identity`], [`LoginResult`]) for the messages and what they mean.
//! - **Codec** ([`Codec`], [`JsonCodec`], [`encode_login_request`],
//!   [`decode_login_result`]) for turning them into bytes and back.
//! - **Errors** ([`ProtocolError`]) for what can go wrong on the way.
//!
//! It knows nothing about sockets or session state; it only validates and
//! converts.
//!
//! ```text
//! Transport (bytes) → Protocol (LoginResult) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{
    Codec, JsonCodec, LOGIN_PATH, answers_login, decode_login_result,
    encode_login_request, frame_kind, strip_frame,
};
pub use error::ProtocolError;
pub use types::{
    Credentials, Identity, LoginRequest, LoginResponse, LoginResult,
    MessageKind, Position, UserData,
};
