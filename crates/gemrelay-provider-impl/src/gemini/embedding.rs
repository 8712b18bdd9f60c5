use gemrelay_protocol::gemini::{BatchEmbedContentsResponse, EmbedContentResponse};
use gemrelay_provider_core::{
    DownstreamSink, RelayContext, RelayError, RelayResult, UpstreamHttpResponse, UsageRecord,
};
use tracing::warn;

use super::{forward_body, log_body};

/// Relays an `embedContent` or `batchEmbedContents` answer. Gemini reports
/// no usage for embeddings, so the prompt count measured by the gateway is
/// billed.
pub async fn relay_embedding<S>(
    ctx: &RelayContext,
    upstream: UpstreamHttpResponse,
    downstream: &mut S,
) -> RelayResult<UsageRecord>
where
    S: DownstreamSink + ?Sized,
{
    let UpstreamHttpResponse {
        status,
        headers,
        body,
    } = upstream;
    let body = body.collect().await.map_err(|err| {
        warn!(event = "upstream_read_failed", trace_id = %ctx.trace_id(), error = %err);
        RelayError::bad_response_body(err)
    })?;
    log_body(ctx, &body);

    if ctx.batch_embedding {
        serde_json::from_slice::<BatchEmbedContentsResponse>(&body)
            .map_err(RelayError::bad_response_body)?;
    } else {
        serde_json::from_slice::<EmbedContentResponse>(&body)
            .map_err(RelayError::bad_response_body)?;
    }

    forward_body(ctx, downstream, status, headers, body).await;
    Ok(UsageRecord::prompt_only(ctx.prompt_tokens))
}
