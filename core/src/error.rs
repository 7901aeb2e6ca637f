use thiserror::Error;

/// Why a request body could not be turned into a payload at all.
///
/// Both variants land on the parse-failure outcome; they are kept apart so
/// logs and tests can tell "not JSON" from "JSON of the wrong shape".
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("request body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request body must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// Configuration problems found while building a scoring policy.
///
/// Raised only at load time. Callers fall back to the built-in policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid score band '{raw}': {reason}")]
    InvalidBand { raw: String, reason: String },
    #[error("unknown scoring mode '{0}' (expected keyword or meal_count)")]
    UnknownMode(String),
    #[error("failed to read keyword table {path}: {source}")]
    TableIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("keyword table {path} is not valid: {source}")]
    TableFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("keyword table has no terms for category {0}")]
    EmptyCategory(&'static str),
}
