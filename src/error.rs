use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedbackError>;

/// A fetched record that could not be turned into a `SubmissionRecord`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed record: {reason} (raw: {raw})")]
pub struct MalformedRecord {
    pub reason: String,
    pub raw: String,
}

impl MalformedRecord {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FeedbackError {
    /// Client-side check failed; no request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("{} of {total} fetched records could not be normalized", .failures.len())]
    Fetch {
        total: usize,
        failures: Vec<(usize, MalformedRecord)>,
    },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl FeedbackError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures detected locally, as opposed to transport or API failures.
    pub fn is_client_side(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Fetch { .. })
    }
}
