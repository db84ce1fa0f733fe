use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Validation error at row {row}: {message}")]
    Validation { row: u32, message: String },

    #[error("Missing attributes. You must input enough: {required:?}")]
    MissingAttributes { required: Vec<String> },

    #[error("Attribute {collection} only accepts {accepted:?}. You input {input}")]
    InvalidAttributeValue {
        collection: String,
        accepted: Vec<String>,
        input: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: String },

    #[error("Column layout error: {0}")]
    Layout(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Only transport failures are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }

    pub fn validation(row: u32, message: impl Into<String>) -> Self {
        SyncError::Validation {
            row,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(SyncError::Network("timeout".to_string()).is_retryable());
        assert!(!SyncError::MissingAttributes { required: vec![] }.is_retryable());
        assert!(!SyncError::validation(3, "title is required").is_retryable());
        assert!(!SyncError::RetriesExhausted {
            attempts: 3,
            last: "timeout".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_invalid_attribute_message_names_collection_and_input() {
        let err = SyncError::InvalidAttributeValue {
            collection: "Platform".to_string(),
            accepted: vec!["PC".to_string()],
            input: "Xbox".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Platform"));
        assert!(msg.contains("Xbox"));
    }
}
