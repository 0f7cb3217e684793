use thiserror::Error;

/// Failures surfaced by [crate::client::ResourceClient].
///
/// A valid but not-yet-ready response is not an error. An absent `status`, or a status that
/// does not yet match the scenario's target, comes back as a normal value and is handled by
/// the polling layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed: connection refused or reset, or a timeout.
    #[error("transport failure for {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response arrived but did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The server answered with a status code the harness does not expect for this operation.
    #[error("unexpected HTTP status {status} for {path}")]
    UnexpectedStatus { status: u16, path: String },

    #[error("invalid resource locator: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub(crate) fn transport(path: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            path: path.to_string(),
            source,
        }
    }
}
