//! Connection-time authentication for WebSocket handshakes.
//!
//! Accepts or refuses a connection attempt. Never touches the session
//! registry; the caller registers only after `authenticate` returns `Ok`.

use axum::http::HeaderMap;
use presence_protocol::close::{REASON_AUTH_FAILED, REASON_MISSING_CREDENTIAL};

use crate::auth::jwt;

/// Credential material presented at handshake time.
#[derive(Debug, Clone, Default)]
pub struct ConnectionAttempt {
    /// `?token=` query parameter
    pub query_token: Option<String>,
    /// `Authorization: Bearer` header on the upgrade request
    pub header_token: Option<String>,
}

impl ConnectionAttempt {
    pub fn new(query_token: Option<String>, headers: &HeaderMap) -> Self {
        let header_token = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        Self {
            query_token,
            header_token,
        }
    }

    /// Query parameter wins over the header. Blank values count as absent.
    pub fn credential(&self) -> Option<&str> {
        [&self.query_token, &self.header_token]
            .into_iter()
            .flatten()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }
}

/// Authenticated identity derived from a valid credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("credential not provided")]
    MissingCredential,
    /// Malformed, badly signed or expired. The cause is logged, not returned.
    #[error("authentication failed")]
    Invalid,
}

impl AuthError {
    /// Text sent to the client in the refusal close frame.
    pub fn close_reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => REASON_MISSING_CREDENTIAL,
            Self::Invalid => REASON_AUTH_FAILED,
        }
    }
}

/// Validate the credential carried by a connection attempt.
pub fn authenticate(secret: &[u8], attempt: &ConnectionAttempt) -> Result<Identity, AuthError> {
    let token = attempt.credential().ok_or(AuthError::MissingCredential)?;

    let claims = jwt::validate_access_token(secret, token).map_err(|err| {
        tracing::warn!(cause = ?err.kind(), "Connection credential rejected");
        AuthError::Invalid
    })?;

    if claims.sub.is_empty() {
        tracing::warn!("Connection credential has empty subject");
        return Err(AuthError::Invalid);
    }

    Ok(Identity {
        user_id: claims.sub,
        role: claims.role,
    })
}
