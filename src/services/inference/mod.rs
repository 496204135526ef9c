/// Generative-text backends used for recipe extraction
use crate::error::AppResult;

pub mod gemini;

pub use gemini::GeminiClient;

/// A service that turns a text prompt into free-form generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AppResult<String>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
