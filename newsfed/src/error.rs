use thiserror::Error;

/// Every failure the client can report.
///
/// Query-parsing errors are raised before any I/O. `Network`, `Http`, `Malformed` and
/// `TaskFailed` are per-agency outcomes: during a fan-out they are captured as diagnostics
/// and never abort the rest of the query. `Unavailable` means the directory could not be
/// read, which fails a query as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewsError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid date format: {0}. Use dd/mm/yyyy")]
    InvalidDateFormat(String),

    #[error("Agency directory unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Agency task failed: {0}")]
    TaskFailed(String),

    #[error("Please login first")]
    NotAuthenticated,

    #[error("Login failed (HTTP {status})")]
    AuthFailed { status: u16 },

    #[error("{0}")]
    Validation(String),

    #[error("Story not found: {0}")]
    NotFound(String),

    #[error("Invalid URL provided: {0}")]
    InvalidUrl(String),

    #[error("Username and password cannot be empty")]
    EmptyCredentials,
}

impl NewsError {
    /// True for outcomes that belong to a single agency and must stay isolated during a fan-out.
    pub fn is_agency_local(&self) -> bool {
        matches!(
            self,
            NewsError::Network(_)
                | NewsError::Http { .. }
                | NewsError::Malformed(_)
                | NewsError::TaskFailed(_)
        )
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NewsError::Network(format!("timed out: {}", err))
        } else {
            NewsError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, NewsError>;
