//! Wire types for the Gemini native API family plus the event-stream framing
//! shared by the relay.

pub mod gemini;
pub mod sse;
