use thiserror::Error;

use crate::content::FetchError;
use crate::gemini::GeminiError;

#[derive(Debug, Error)]
pub enum MirasError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No API key configured. Pass --api-key or set GEMINI_API_KEY.")]
    MissingCredential,

    #[error("Unknown region: {0}. Run `miras regions` to list them.")]
    UnknownRegion(String),

    #[error(transparent)]
    Content(#[from] FetchError),

    #[error("Generative service error: {0}")]
    Gemini(#[from] GeminiError),

    #[error("Image sequence task failed: {0}")]
    Sequence(#[from] tokio::task::JoinError),
}

impl MirasError {
    /// True when the user has to supply a different API key.
    pub fn needs_new_credential(&self) -> bool {
        matches!(
            self,
            MirasError::MissingCredential | MirasError::Content(FetchError::InvalidCredential(_))
        )
    }
}
