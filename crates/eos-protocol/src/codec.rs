//! Turning login messages into bytes and back.
//!
//! The serialization format sits behind the [`Codec`] trait; the login
//! functions ([`encode_login_request`], [`decode_login_result`]) use
//! [`JsonCodec`], which is what the login service speaks. On top of plain
//! JSON parsing the decode path applies the framing rules of the socket
//! transport (trailing newline, stray whitespace, a UTF-8 BOM) and the
//! protocol rules enforced by [`LoginResult`]'s `TryFrom`.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::types::{
    Credentials, LoginRequest, LoginResponse, LoginResult, MessageKind,
};
use crate::ProtocolError;

/// Request path of the login endpoint on the HTTP service.
pub const LOGIN_PATH: &str = "/api/login";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one instance can be shared with the session
/// task that owns the login flow.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Login messages
// ---------------------------------------------------------------------------

/// Encodes `{"type":"LOGIN","userId":...}` for the given credentials.
///
/// Special characters in the id are JSON-escaped; the output is compact
/// and carries no trailing newline (the socket transport adds its own
/// delimiter).
pub fn encode_login_request(
    credentials: &Credentials,
) -> Result<Vec<u8>, ProtocolError> {
    JsonCodec.encode(&LoginRequest::new(credentials))
}

/// Decodes a login response payload into a [`LoginResult`].
///
/// # Errors
/// - [`ProtocolError::InvalidMessage`] for an empty payload or a `type`
///   other than `LOGIN_RESPONSE`.
/// - [`ProtocolError::Decode`] for malformed JSON or a missing `success`.
/// - [`ProtocolError::MissingUserData`] for `success: true` without
///   `userData`.
pub fn decode_login_result(data: &[u8]) -> Result<LoginResult, ProtocolError> {
    let body = strip_frame(data);
    if body.is_empty() {
        return Err(ProtocolError::InvalidMessage("empty payload".into()));
    }

    let response: LoginResponse = JsonCodec.decode(body)?;
    let result = LoginResult::try_from(response)?;

    tracing::trace!(success = result.is_success(), "decoded login response");
    Ok(result)
}

/// Reads only the `type` tag of a frame.
///
/// `Ok(None)` for a JSON object without a tag.
///
/// # Errors
/// [`ProtocolError::InvalidMessage`] for an empty frame,
/// [`ProtocolError::Decode`] if it is not a JSON object.
pub fn frame_kind(data: &[u8]) -> Result<Option<String>, ProtocolError> {
    #[derive(Deserialize)]
    struct Tag {
        #[serde(rename = "type", default)]
        kind: Option<String>,
    }

    let body = strip_frame(data);
    if body.is_empty() {
        return Err(ProtocolError::InvalidMessage("empty payload".into()));
    }
    let tag: Tag = JsonCodec.decode(body)?;
    Ok(tag.kind)
}

/// Whether a frame on the socket is the answer to a login request.
///
/// `LOGIN_RESPONSE` frames are, and so are untagged objects since older
/// servers omit the tag. Anything else (another `type`, or bytes that are
/// not a JSON object) is a server push.
pub fn answers_login(data: &[u8]) -> bool {
    match frame_kind(data) {
        Ok(None) => true,
        Ok(Some(kind)) => kind == MessageKind::LoginResponse.as_str(),
        Err(_) => false,
    }
}

/// Removes socket framing around a single JSON document: a leading UTF-8
/// byte order mark and surrounding ASCII whitespace, which covers the
/// trailing `\n` or `\r\n` delimiter.
pub fn strip_frame(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    data.trim_ascii()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    const ACCEPTED: &str = r#"{"type":"LOGIN_RESPONSE","success":true,"message":"ok","userData":{"userNo":1,"userId":"abc","nickname":"Rin","gold":100,"lastX":3.0,"lastY":4.0}}"#;

    // =====================================================================
    // frame_kind / answers_login
    // =====================================================================

    #[test]
    fn test_frame_kind_reads_tag_only() {
        let notice = b"{\"type\":\"NOTICE\",\"text\":\"server restart\"}\n";
        assert_eq!(frame_kind(notice).unwrap().as_deref(), Some("NOTICE"));
        assert_eq!(frame_kind(br#"{"success":false}"#).unwrap(), None);
    }

    #[test]
    fn test_frame_kind_rejects_empty_and_non_objects() {
        assert!(matches!(
            frame_kind(b" \r\n"),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(matches!(frame_kind(b"42"), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_answers_login_routes_by_tag() {
        assert!(answers_login(ACCEPTED.as_bytes()));
        assert!(answers_login(br#"{"success":false,"message":"x"}"#));
        assert!(!answers_login(br#"{"type":"NOTICE","text":"server restart"}"#));
        assert!(!answers_login(br#"{"type":"LOGIN","userId":"abc"}"#));
        assert!(!answers_login(b"not json"));
    }

    // =====================================================================
    // encode_login_request
    // =====================================================================

    #[test]
    fn test_encode_login_request_exact_bytes() {
        let creds = Credentials::new("abc").unwrap();
        let bytes = encode_login_request(&creds).unwrap();
        assert_eq!(bytes, br#"{"type":"LOGIN","userId":"abc"}"#);
    }

    #[test]
    fn test_encode_login_request_escapes_quotes() {
        let creds = Credentials::new("say \"hi\"").unwrap();
        let bytes = encode_login_request(&creds).unwrap();
        assert_eq!(bytes, br#"{"type":"LOGIN","userId":"say \"hi\""}"#);

        // And the escaped form parses back to the original id.
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["userId"], "say \"hi\"");
    }

    #[test]
    fn test_encode_login_request_has_no_trailing_newline() {
        let creds = Credentials::new("abc").unwrap();
        let bytes = encode_login_request(&creds).unwrap();
        assert_ne!(bytes.last(), Some(&b'\n'));
    }

    // =====================================================================
    // decode_login_result
    // =====================================================================

    #[test]
    fn test_decode_accepted_login() {
        let result = decode_login_result(ACCEPTED.as_bytes()).unwrap();

        let identity = result.identity().expect("accepted login has identity");
        assert_eq!(identity.user_no, 1);
        assert_eq!(identity.nickname, "Rin");
        assert_eq!(identity.gold, 100);
        assert_eq!(identity.last_position, Position::new(3.0, 4.0));
        assert_eq!(result.message(), "ok");
    }

    #[test]
    fn test_decode_rejected_login() {
        let result = decode_login_result(
            br#"{"type":"LOGIN_RESPONSE","success":false,"message":"no such user"}"#,
        )
        .unwrap();
        assert!(!result.is_success());
        assert_eq!(result.message(), "no such user");
    }

    #[test]
    fn test_decode_accepts_missing_type_tag() {
        let result =
            decode_login_result(br#"{"success":false,"message":"x"}"#).unwrap();
        assert!(!result.is_success());
    }

    #[test]
    fn test_decode_rejects_unknown_type_tag() {
        let err = decode_login_result(br#"{"type":"CHAT","success":false}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn test_decode_rejects_request_type_tag() {
        let err = decode_login_result(br#"{"type":"LOGIN","success":false}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)), "got {err:?}");
    }

    #[test]
    fn test_decode_strips_socket_framing() {
        let framed = format!("\u{feff}{ACCEPTED}\r\n");
        let result = decode_login_result(framed.as_bytes()).unwrap();
        assert!(result.is_success());

        let lf = format!("{ACCEPTED}\n");
        assert!(decode_login_result(lf.as_bytes()).unwrap().is_success());
    }

    #[test]
    fn test_decode_empty_payload_is_invalid_message() {
        for payload in [&b""[..], b"\n", b"  \r\n"] {
            assert!(matches!(
                decode_login_result(payload),
                Err(ProtocolError::InvalidMessage(_))
            ));
        }
    }

    #[test]
    fn test_decode_malformed_json_is_decode_error() {
        let err = decode_login_result(b"{\"success\":").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_missing_success_is_decode_error() {
        let err = decode_login_result(br#"{"message":"ok"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_success_without_user_data_is_violation() {
        for body in [
            &br#"{"success":true,"message":"ok"}"#[..],
            br#"{"success":true,"message":"ok","userData":null}"#,
        ] {
            assert!(matches!(
                decode_login_result(body),
                Err(ProtocolError::MissingUserData)
            ));
        }
    }

    #[test]
    fn test_decode_rejects_two_documents_in_one_payload() {
        let payload = format!("{ACCEPTED}\n{ACCEPTED}\n");
        assert!(decode_login_result(payload.as_bytes()).is_err());
    }

    #[test]
    fn test_strip_frame_leaves_inner_bytes_alone() {
        assert_eq!(strip_frame(b"  {\"a\": 1 }\n"), b"{\"a\": 1 }");
        assert_eq!(strip_frame(b""), b"");
    }

    #[test]
    fn test_json_codec_decode_wrong_shape_is_decode_error() {
        let result: Result<LoginResponse, _> = JsonCodec.decode(b"[1,2,3]");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
