mod embedding;
mod generate;
mod stream;

use bytes::Bytes;
use gemrelay_provider_core::{
    DownstreamSink, Headers, RelayContext, header_remove, header_set,
};
use tracing::{debug, warn};

pub use embedding::relay_embedding;
pub use generate::relay_generate;
pub use stream::{ChunkAction, StreamOutcome, StreamSession, relay_stream};

/// Multiplier for generated images when Gemini reports no candidate tokens.
pub const IMAGE_COMPLETION_TOKENS: u32 = 258;

/// Copies a validated upstream body to the client unchanged.
///
/// Write failures mean the client went away; usage is still billed, so
/// they are logged instead of failing the relay.
async fn forward_body<S>(
    ctx: &RelayContext,
    downstream: &mut S,
    status: u16,
    mut headers: Headers,
    body: Bytes,
) where
    S: DownstreamSink + ?Sized,
{
    header_remove(&mut headers, "transfer-encoding");
    header_remove(&mut headers, "content-encoding");
    header_set(&mut headers, "Content-Length", body.len().to_string());

    if let Err(err) = downstream.send_head(status, &headers).await {
        warn!(event = "downstream_write_failed", trace_id = %ctx.trace_id(), error = %err);
        return;
    }
    if let Err(err) = downstream.send_body(body).await {
        warn!(event = "downstream_write_failed", trace_id = %ctx.trace_id(), error = %err);
    }
}

fn log_body(ctx: &RelayContext, body: &[u8]) {
    if ctx.debug_body {
        debug!(
            event = "upstream_body",
            trace_id = %ctx.trace_id(),
            body = %String::from_utf8_lossy(body),
        );
    }
}
