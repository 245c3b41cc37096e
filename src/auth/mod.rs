//! Access token loading. Tokens are obtained out of band (any OAuth flow
//! that writes the usual `token.json`); this module only reads them.

pub mod error;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use self::error::AuthError;

/// On-disk OAuth token as written by the common Google client libraries.
#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[allow(dead_code)] // parsed so a refresh-capable file is accepted as-is
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Bearer token for the Drive API.
///
/// `explicit` (from `--access-token` or `GDRIVE_ACCESS_TOKEN`) wins when it
/// is non-empty. Otherwise `token_file` is read. Tokens are never refreshed,
/// so an expired one only earns a warning and the first request will tell.
pub async fn load_access_token(
    explicit: Option<&str>,
    token_file: &Path,
) -> Result<String, AuthError> {
    if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        tracing::debug!("Using access token from command line or environment");
        return Ok(token.to_string());
    }

    let path = token_file.display().to_string();
    let raw = tokio::fs::read_to_string(token_file)
        .await
        .map_err(|source| AuthError::Read {
            path: path.clone(),
            source,
        })?;
    let parsed: TokenFile = serde_json::from_str(&raw).map_err(|source| AuthError::Parse {
        path: path.clone(),
        source,
    })?;

    if !parsed.token_type.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::UnsupportedTokenType(parsed.token_type));
    }
    let token = parsed.access_token.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken(path));
    }
    if let Some(expiry) = parsed.expiry {
        if expiry <= Utc::now() {
            tracing::warn!(
                "Access token in {} expired at {}; requests will likely be rejected",
                path,
                expiry.to_rfc3339()
            );
        }
    }
    Ok(token.to_string())
}
