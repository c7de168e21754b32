use thiserror::Error;

/// Errors produced by the dashboard components and the backend client
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Client-side validation failed; the operation was not attempted
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-success status
    #[error("Request failed with status code {status}")]
    Api {
        status: u16,
        /// Structured `detail` field of the error body, if the server sent one
        detail: Option<String>,
    },

    /// The request never produced a response (connection refused, DNS, ...)
    #[error("Network error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Export failed: {0}")]
    Export(String),

    /// A report is already being generated by this dashboard
    #[error("A report is already being generated")]
    ReportInProgress,
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    /// Server-provided detail message, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            DashboardError::Api {
                detail: Some(detail),
                ..
            } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    /// Message shown to the user: the server detail, else this error's own
    /// message, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }

        let message = match self {
            DashboardError::Validation(m)
            | DashboardError::Transport(m)
            | DashboardError::Decode(m)
                if m.trim().is_empty() =>
            {
                String::new()
            }
            other => other.to_string(),
        };
        if message.is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

    /// Message used where the server detail is the only trusted source,
    /// i.e. the detail if present and `fallback` otherwise.
    pub fn detail_or(&self, fallback: &str) -> String {
        self.detail()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else {
            DashboardError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

impl From<serde_yaml::Error> for DashboardError {
    fn from(err: serde_yaml::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<bincode::Error> for DashboardError {
    fn from(err: bincode::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}
