pub mod client;
pub mod error;
pub mod types;

pub use client::{GeminiClient, ImageGenerator};
pub use error::GeminiError;
pub use types::GeneratedImage;
