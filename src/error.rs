//! Error types for PDF Form MCP Server

use thiserror::Error;

/// Result type alias for PDF Form MCP Server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for PDF Form MCP Server
#[derive(Error, Debug)]
pub enum Error {
    /// Source document (or saved field file) not found
    #[error("Input not found: {path}")]
    InputNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// External toolkit missing or not runnable
    #[error("{tool} is not installed or not runnable: {reason}")]
    ToolNotInstalled { tool: String, reason: String },

    /// External toolkit exited with failure or could not be driven
    #[error("{tool} failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    /// External toolkit exceeded its time budget and was killed
    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    /// Toolkit output could not be read
    #[error("Failed to read toolkit output: {reason}")]
    ParseFailed { reason: String },

    /// Workspace creation or output placement failed
    #[error("Temporary resource error: {reason}")]
    TempResourceFailed { reason: String },

    /// Fill value is not a scalar
    #[error("Invalid value for field {name}: {reason}")]
    InvalidFieldValue { name: String, reason: String },

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, tool stderr, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::InputNotFound { .. } => "Input not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::ToolNotInstalled { tool, .. } => format!("{} is not available", tool),
            Error::ToolExecutionFailed { .. } => "PDF toolkit failed".to_string(),
            Error::Timeout { seconds, .. } => {
                format!("PDF toolkit timed out after {}s", seconds)
            }
            Error::ParseFailed { .. } => "Failed to read form field data".to_string(),
            Error::TempResourceFailed { .. } => "Temporary workspace error".to_string(),
            Error::InvalidFieldValue { name, reason } => {
                format!("Invalid value for field {}: {}", name, reason)
            }
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_details() {
        let err = Error::ToolExecutionFailed {
            tool: "pdftk".to_string(),
            reason: "exit status 1: Error: Unable to find file /secret/form.pdf".to_string(),
        };
        assert!(err.to_string().contains("/secret/form.pdf"));
        assert!(!err.client_message().contains("/secret"));

        let err = Error::InputNotFound {
            path: "/secret/form.pdf".to_string(),
        };
        assert_eq!(err.client_message(), "Input not found");
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout {
            tool: "pdftk".to_string(),
            seconds: 120,
        };
        assert_eq!(err.to_string(), "pdftk timed out after 120s");
        assert_eq!(err.client_message(), "PDF toolkit timed out after 120s");
    }
}
