//! Error types for the context store.

/// Errors raised when reading typed data out of a [`Content`](crate::Content)
/// or when (de)serializing it.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The value at a path could not be converted into the requested type.
    #[error("value at `{path}` cannot be converted: {source}")]
    Conversion {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A role string did not name any known role.
    #[error("unknown role `{0}`")]
    UnknownRole(String),

    /// The predecessor chain is longer than the canonical JSON form holds.
    #[error("content chain of depth {depth} exceeds the json limit of {max}")]
    TooDeep { depth: usize, max: usize },

    /// Canonical JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
