use berlin_ckan::CkanError;
use thiserror::Error;

/// Errors surfaced by catalog operations.
///
/// Every upstream failure maps to exactly one of `InvalidQuery`, `NotFound`,
/// `Upstream` or `Timeout`. Nothing is retried and nothing is suppressed.
#[derive(Error, Debug)]
pub enum OpenDataError {
    /// Malformed parameters, or search syntax the catalog rejected
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The requested dataset or category does not exist
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Non-success response, network failure or malformed JSON
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        #[source]
        source: Option<CkanError>,
    },

    /// No response within the configured bound
    #[error("timed out after {seconds}s waiting for the catalog")]
    Timeout { seconds: u64 },

    /// Configuration error
    #[error("configuration error: {message}")]
    Config { message: String },
}

/// The upstream call an error came from, which decides how CKAN statuses map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Dataset,
    Category,
    Tags,
    Stats,
}

impl OpenDataError {
    /// Create a new invalid query error
    pub fn invalid_query<S: Into<String>>(message: S) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an upstream error without an underlying CKAN error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable snake_case label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery { .. } => "invalid_query",
            Self::NotFound { .. } => "not_found",
            Self::Upstream { .. } => "upstream",
            Self::Timeout { .. } => "timeout",
            Self::Config { .. } => "config",
        }
    }

    /// The error text without the kind prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidQuery { message }
            | Self::NotFound { message }
            | Self::Upstream { message, .. }
            | Self::Config { message } => message.clone(),
            Self::Timeout { seconds } => format!("no response from the catalog within {seconds}s"),
        }
    }

    /// Classify a CKAN failure.
    ///
    /// CKAN answers unknown ids with 404 / `Not Found Error` and rejected Solr
    /// syntax with 409 / `Search Query Error`. Validation errors on search or
    /// lookups are the caller's fault too.
    pub fn from_ckan(err: CkanError, operation: Operation, timeout_secs: u64) -> Self {
        match &err {
            CkanError::Timeout => Self::Timeout {
                seconds: timeout_secs,
            },
            CkanError::ApiError {
                status,
                kind,
                message,
            } => {
                let kind = kind.as_deref().unwrap_or_default();
                if *status == 404 || kind == "Not Found Error" {
                    match operation {
                        Operation::Dataset | Operation::Category => Self::not_found(message.clone()),
                        _ => Self::Upstream {
                            message: message.clone(),
                            source: Some(err),
                        },
                    }
                } else if kind == "Search Query Error"
                    || (operation == Operation::Search && matches!(status, 400 | 409))
                    || kind == "Validation Error"
                {
                    Self::invalid_query(message.clone())
                } else {
                    Self::Upstream {
                        message: err.to_string(),
                        source: Some(err),
                    }
                }
            }
            CkanError::RequestError(_) | CkanError::ParseError(_) => Self::Upstream {
                message: err.to_string(),
                source: Some(err),
            },
        }
    }
}

/// Type alias for Results using OpenDataError
pub type Result<T> = std::result::Result<T, OpenDataError>;
