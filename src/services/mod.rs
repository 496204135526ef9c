pub mod batch;
pub mod extraction;
pub mod inference;
pub mod processor;
pub mod progress;
pub mod recommendations;
pub mod sources;

pub use batch::BatchRunner;
pub use extraction::RecipeExtractor;
pub use inference::{GeminiClient, TextGenerator};
pub use processor::ItemProcessor;
pub use progress::StatusBoard;
pub use sources::{PlaylistResolver, VideoSource, YouTubeClient};
