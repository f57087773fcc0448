use thiserror::Error;

/// Failure of a single gateway call.
///
/// Transport and application failures drive the same rollback path; the
/// split only matters for the message shown to the user.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Application { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    Invalid(#[from] ValidationError),
}

impl GatewayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }

    /// Text suitable for a transient error notice.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Transport(_) => {
                "Network error. Check your connection and try again.".to_string()
            }
            GatewayError::Application { message, .. } => message.clone(),
            GatewayError::NotFound(what) => format!("{what} not found"),
            GatewayError::Decode(_) => "Unexpected response from server".to_string(),
            GatewayError::Invalid(e) => e.to_string(),
        }
    }
}

/// Structural validation performed before any network call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Content is required")]
    EmptyContent,

    #[error("Content must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Name is required")]
    EmptyName,

    #[error("Either content or category must be provided")]
    EmptyPatch,

    #[error("No fields to update")]
    EmptyPersonPatch,

    #[error("Unknown insight category: {0}")]
    UnknownCategory(String),
}
