mod decoder;
mod source;

pub use decoder::StreamDecoder;
pub use source::byte_stream_from;
