use anyhow::anyhow;
use format_serde_error::SerdeError;
use reqwest::StatusCode;

use taskdeck::task::TaskId;

fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}

impl std::fmt::Debug for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum ClientError {
    #[error("Invalid input data: {user_error}")]
    InvalidInputData { user_error: String },
    #[error("Unauthorized access: {0}")]
    Unauthorized(String),
    #[error("Remote service error ({status}): {message}")]
    Remote { status: StatusCode, message: String },
    #[error("A mutation is already in flight for task {0}")]
    Conflict(TaskId),
    #[error("Failed to reach the remote service")]
    Transport(#[source] reqwest::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ClientError {
    pub(crate) fn from_json_serde_error(serde_error: serde_json::Error, input: String) -> Self {
        if serde_error.to_string().starts_with("missing field") {
            ClientError::Unexpected(anyhow!("{serde_error}: {input}"))
        } else {
            ClientError::Unexpected(<SerdeError as Into<anyhow::Error>>::into(SerdeError::new(
                input,
                serde_error,
            )))
        }
    }

    pub(crate) fn invalid_input(errors: validator::ValidationErrors) -> Self {
        ClientError::InvalidInputData {
            user_error: errors.to_string(),
        }
    }

    /// Message suitable for direct display to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::InvalidInputData { user_error } => user_error.clone(),
            ClientError::Unauthorized(message) => message.clone(),
            ClientError::Remote { message, .. } => message.clone(),
            ClientError::Conflict(_) => "This operation is already in progress".to_string(),
            ClientError::Transport(_) => {
                "A network error occurred. Please try again.".to_string()
            }
            ClientError::Unexpected(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }
}
