//! Login protocol types.
//!
//! Two layers live here:
//!
//! - **Wire types** ([`LoginRequest`], [`LoginResponse`], [`UserData`]) that
//!   mirror the JSON documents exchanged with the login service, field for
//!   field (`userId`, `userData`, `lastX`, ...).
//! - **Domain types** ([`Credentials`], [`Identity`], [`LoginResult`]) that
//!   the rest of the client works with. Converting wire → domain is where
//!   the protocol's rules are enforced.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// What the player typed into the login form.
///
/// Only a user id; the login service does not take a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    user_id: String,
}

impl Credentials {
    /// Validates and wraps a user id.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidCredentials`] if the id is empty (or only
    /// whitespace) or contains control characters.
    pub fn new(user_id: impl Into<String>) -> Result<Self, ProtocolError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(ProtocolError::InvalidCredentials(
                "user id must not be empty".into(),
            ));
        }
        if user_id.chars().any(char::is_control) {
            return Err(ProtocolError::InvalidCredentials(
                "user id must not contain control characters".into(),
            ));
        }
        Ok(Self { user_id })
    }

    /// The validated user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

// ---------------------------------------------------------------------------
// Position / Identity
// ---------------------------------------------------------------------------

/// A point on the ground plane, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The player identity assigned by the server after a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Server-side account number.
    pub user_no: i64,
    /// The id the player logged in with.
    pub user_id: String,
    /// Display name shown above the character.
    pub nickname: String,
    pub gold: i64,
    /// Where the character was when the player last logged out.
    pub last_position: Position,
}

impl From<UserData> for Identity {
    fn from(data: UserData) -> Self {
        Self {
            user_no: data.user_no,
            user_id: data.user_id,
            nickname: data.nickname,
            gold: data.gold,
            last_position: Position::new(data.last_x, data.last_y),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// The `type` tag carried by every login message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "LOGIN")]
    Login,
    #[serde(rename = "LOGIN_RESPONSE")]
    LoginResponse,
}

impl MessageKind {
    /// The tag as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::LoginResponse => "LOGIN_RESPONSE",
        }
    }
}

/// Client → server: `{"type":"LOGIN","userId":"..."}`.
///
/// Exactly these two fields, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(rename = "userId")]
    user_id: String,
}

impl LoginRequest {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            kind: MessageKind::Login,
            user_id: credentials.user_id().to_owned(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Server → client: the login response document.
///
/// `type` is optional on input because older servers omit it; when present
/// it must be `LOGIN_RESPONSE`. `success` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default)]
    pub user_data: Option<UserData>,
}

/// The `userData` object of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub user_no: i64,
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nickname: String,
    pub gold: i64,
    pub last_x: f32,
    pub last_y: f32,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// LoginResult
// ---------------------------------------------------------------------------

/// The outcome of a login, after protocol validation.
///
/// An identity exists exactly when the login was accepted; the two cases
/// are separate variants so the combination can't be represented wrongly.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResult {
    Accepted { message: String, identity: Identity },
    Rejected { message: String },
}

impl LoginResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The server's human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Accepted { message, .. } | Self::Rejected { message } => {
                message
            }
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Accepted { identity, .. } => Some(identity),
            Self::Rejected { .. } => None,
        }
    }
}

impl TryFrom<LoginResponse> for LoginResult {
    type Error = ProtocolError;

    fn try_from(response: LoginResponse) -> Result<Self, Self::Error> {
        if let Some(kind) = response.kind {
            if kind != MessageKind::LoginResponse {
                return Err(ProtocolError::InvalidMessage(format!(
                    "expected LOGIN_RESPONSE, got {kind:?}"
                )));
            }
        }

        if !response.success {
            // userData on a failed login is ignored.
            return Ok(Self::Rejected {
                message: response.message,
            });
        }

        let data = response.user_data.ok_or(ProtocolError::MissingUserData)?;
        Ok(Self::Accepted {
            message: response.message,
            identity: data.into(),
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
