pub mod response;

pub use response::{BatchEmbedContentsResponse, ContentEmbedding, EmbedContentResponse};
