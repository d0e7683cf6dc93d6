//! SASL mechanism encoding for email protocols.
//!
//! Implements the client side of PLAIN (RFC 4616), LOGIN (draft),
//! XOAUTH2 (Google/Microsoft proprietary) and OAUTHBEARER (RFC 7628).
//! Each function returns the base64 payload that goes on the wire after
//! `AUTHENTICATE <mechanism>` (or as the SASL-IR initial response).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Generates a PLAIN initial response (RFC 4616).
///
/// Format: `<authzid> NUL <authcid> NUL <password>`. The authorization
/// identity is usually empty; pass `Some(authzid)` to act on behalf of
/// another identity.
#[must_use]
pub fn plain_response(authzid: Option<&str>, user: &str, password: &str) -> String {
    let auth_string = format!("{}\0{user}\0{password}", authzid.unwrap_or_default());
    STANDARD.encode(auth_string.as_bytes())
}

/// Generates OAUTHBEARER initial response (RFC 7628).
///
/// Format: `n,a=<user>,\x01host=<host>\x01port=<port>\x01auth=Bearer <token>\x01\x01`
///
/// # Arguments
///
/// * `user` - User email address
/// * `host` - Server hostname (advisory, part of the GS2 header block)
/// * `port` - Server port
/// * `token` - `OAuth2` access token
#[must_use]
pub fn oauthbearer_response(user: &str, host: &str, port: u16, token: &str) -> String {
    let auth_string =
        format!("n,a={user},\x01host={host}\x01port={port}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Generates XOAUTH2 initial response (Google/Microsoft proprietary).
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01`
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Encodes a response to an AUTH=LOGIN server prompt.
///
/// The LOGIN mechanism sends two `+` prompts ("Username:" and "Password:"),
/// each answered with the bare base64 of the value.
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Classification of an AUTH=LOGIN server prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPrompt {
    /// Server asked for the username.
    Username,
    /// Server asked for the password.
    Password,
    /// Prompt text was not recognised.
    Unknown,
}

/// Classifies an AUTH=LOGIN continuation prompt.
///
/// Prompts arrive base64-encoded; servers vary in wording ("Username:",
/// "User Name", "Password:"), so matching is case-insensitive on the
/// decoded text.
#[must_use]
pub fn classify_login_prompt(prompt: &str) -> LoginPrompt {
    let decoded = STANDARD
        .decode(prompt.trim().as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| prompt.to_string());
    let lower = decoded.to_lowercase();

    if lower.contains("user") {
        LoginPrompt::Username
    } else if lower.contains("pass") {
        LoginPrompt::Password
    } else {
        LoginPrompt::Unknown
    }
}

/// Parses an `OAuth2` error response from the server.
///
/// `OAuth2` errors are JSON-encoded: `{"status":"401", "schemes":"bearer", "scope":"..."}`
/// and arrive base64-encoded in a `+` continuation after a failed
/// XOAUTH2/OAUTHBEARER exchange.
///
/// # Errors
///
/// Returns an error if the response cannot be parsed.
pub fn parse_oauth_error(response: &str) -> Result<OAuthError, serde_json::Error> {
    let decoded = STANDARD
        .decode(response.trim().as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| response.to_string());
    serde_json::from_str(&decoded)
}

/// `OAuth2` error response from server.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthError {
    /// HTTP status code.
    pub status: String,
    /// Authentication schemes supported.
    #[serde(default)]
    pub schemes: Option<String>,
    /// `OAuth2` scope required.
    #[serde(default)]
    pub scope: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_response() {
        let response = plain_response(None, "user@example.com", "hunter2");
        let decoded = STANDARD.decode(&response).unwrap();

        assert_eq!(decoded, b"\0user@example.com\0hunter2");
    }

    #[test]
    fn test_plain_response_with_authzid() {
        let response = plain_response(Some("admin@example.com"), "user@example.com", "pw");
        let decoded = STANDARD.decode(&response).unwrap();

        assert_eq!(decoded, b"admin@example.com\0user@example.com\0pw");
    }

    #[test]
    fn test_oauthbearer_response() {
        let response = oauthbearer_response("user@example.com", "imap.example.com", 993, "token123");
        let decoded = STANDARD.decode(&response).unwrap();
        let decoded_str = String::from_utf8(decoded).unwrap();

        assert!(decoded_str.starts_with("n,a=user@example.com"));
        assert!(decoded_str.contains("host=imap.example.com"));
        assert!(decoded_str.contains("port=993"));
        assert!(decoded_str.contains("auth=Bearer token123"));
        assert!(decoded_str.ends_with("\x01\x01"));
    }

    #[test]
    fn test_xoauth2_format() {
        let response = xoauth2_response("test@test.com", "abc");
        let decoded = STANDARD.decode(&response).unwrap();
        let decoded_str = String::from_utf8(decoded).unwrap();

        // Check exact XOAUTH2 format
        assert_eq!(decoded_str, "user=test@test.com\x01auth=Bearer abc\x01\x01");
    }

    #[test]
    fn test_classify_login_prompt() {
        // "Username:" / "Password:" base64-encoded, as Exchange and Dovecot send them
        assert_eq!(classify_login_prompt("VXNlcm5hbWU6"), LoginPrompt::Username);
        assert_eq!(classify_login_prompt("UGFzc3dvcmQ6"), LoginPrompt::Password);
        assert_eq!(classify_login_prompt("Z28gYXdheQ=="), LoginPrompt::Unknown);
    }

    #[test]
    fn test_classify_login_prompt_plain_text() {
        // Some servers skip the base64 on the prompt text
        assert_eq!(classify_login_prompt("User Name"), LoginPrompt::Username);
    }

    #[test]
    fn test_parse_oauth_error() {
        let json = r#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        let encoded = STANDARD.encode(json);
        let error = parse_oauth_error(&encoded).unwrap();

        assert_eq!(error.status, "401");
        assert_eq!(error.schemes.as_deref(), Some("bearer"));
        assert_eq!(error.scope.as_deref(), Some("https://mail.google.com/"));
    }

    #[test]
    fn test_responses_are_base64() {
        let response = oauthbearer_response("user@example.com", "imap.example.com", 993, "token");
        // Should not contain raw text, only base64 characters
        assert!(!response.contains("user@example.com"));
        assert!(!response.contains("token"));
        assert!(STANDARD.decode(&response).is_ok());
    }
}
