use thiserror::Error;

/// Failure of a single title or chapter request.
///
/// The display text is the generic retry message; the cause is kept for logs.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Failed to generate content. Please try again.")]
    Generation(String),
}

impl ServiceError {
    pub fn cause(&self) -> &str {
        match self {
            ServiceError::Generation(cause) => cause,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Please enter a valid word")]
    InvalidInput,
    #[error("Please enter a single word or short phrase (max 2 words)")]
    TooManyWords,
    #[error("No definition found for \"{0}\"")]
    NotFound(String),
    #[error("Failed to get word definition. Please try again.")]
    Service(String),
}

/// The only error a story run surfaces to its caller.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Story generation failed: {0}")]
    TitleFailed(String),
}
