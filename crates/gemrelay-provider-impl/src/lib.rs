//! Gemini native relay: whole-response, embedding and streaming translators.

pub mod dispatch;
pub mod gemini;
pub mod tokenizer;

pub use dispatch::{StreamDecoder, byte_stream_from};
pub use gemini::{
    StreamOutcome, StreamSession, relay_embedding, relay_generate, relay_stream,
};
pub use tokenizer::{TextTokenEstimator, TiktokenEstimator};
