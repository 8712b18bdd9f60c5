pub mod response;
pub mod types;

pub use response::GenerateContentResponse;
pub use types::{Candidate, PromptFeedback, UsageMetadata};
