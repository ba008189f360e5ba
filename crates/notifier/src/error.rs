//! Error types for rendering and delivering a notification.

use thiserror::Error;

/// Template problems, split by the phase that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template text is not valid syntax.
    #[error("Template parse error: {0}")]
    Parse(String),

    /// The template parsed but could not be evaluated.
    #[error("Template execution error: {0}")]
    Execution(String),
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Text or webhook missing
    #[error("Required parameters not specified")]
    MissingParameters,

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The webhook could not be reached at all
    #[error("HTTP request to Slack could not be sent: {0}")]
    Transport(String),

    /// The webhook answered with a status above 399
    #[error("HTTP request to Slack failed with status {status}")]
    DispatchFailed { status: u16 },
}
