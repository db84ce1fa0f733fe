//! Reads claims out of the session token. The signature is not verified: the
//! token is only used to learn which seller account is signed in.

use crate::error::{Result, SyncError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Seller (user) id
    pub sub: String,
    #[serde(default)]
    pub exp: Option<i64>,
}

pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let token = token.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(SyncError::Workflow(format!(
            "Invalid JWT token format: expected 3 parts, got {}",
            parts.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| SyncError::Workflow(format!("Invalid JWT token format: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| SyncError::Workflow(format!("Invalid JWT token format: {}", e)))
}

/// Seller id carried by the token.
pub fn seller_id(token: &str) -> Result<String> {
    Ok(decode_claims(token)?.sub)
}

#[cfg(test)]
pub(crate) fn make_token(payload_json: &str) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#),
        URL_SAFE_NO_PAD.encode(payload_json)
    )
}
