use serde::{Deserialize, Serialize};

/// What a signed token may be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    PasswordReset,
}

/// Payload shared by session and password-reset tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,        // user id
    pub iat: i64,        // issued at (unix timestamp)
    pub exp: i64,        // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub kind: TokenKind, // token type
    /// Password fingerprint; only sessions carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
}
