use thiserror::Error;

use slack_common::error::AppError;
use slack_notifier::NotifyError;

/// Errors returned to whoever asked for a notification.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("webhook not specified")]
    WebhookMissing,

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::WebhookMissing => AppError::Validation(err.to_string()),
            CoordinatorError::Notify(NotifyError::MissingParameters) => {
                AppError::Validation(err.to_string())
            }
            CoordinatorError::Notify(NotifyError::Template(_)) => AppError::Template(err.to_string()),
            CoordinatorError::Notify(_) => AppError::Dispatch(err.to_string()),
        }
    }
}
