use thiserror::Error;

/// Why no usable access token could be obtained.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Cannot read token file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed token file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Token file {0} contains an empty access token")]
    EmptyToken(String),

    #[error("Unsupported token type '{0}' (expected Bearer)")]
    UnsupportedTokenType(String),
}
