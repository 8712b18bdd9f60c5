pub mod embed_content;
pub mod generate_content;
pub mod types;

pub use embed_content::{BatchEmbedContentsResponse, ContentEmbedding, EmbedContentResponse};
pub use generate_content::{
    Candidate, GenerateContentResponse, PromptFeedback, UsageMetadata,
};
pub use types::{Blob, Content, ContentRole, Modality, ModalityTokenCount, Part};
