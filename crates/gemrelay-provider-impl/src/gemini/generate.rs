use gemrelay_protocol::gemini::GenerateContentResponse;
use gemrelay_protocol::gemini::generate_content::response::lacks_candidates_token_count;
use gemrelay_provider_core::{
    DownstreamSink, RelayContext, RelayError, RelayResult, UpstreamHttpResponse, UsageRecord,
};
use tracing::warn;

use super::{forward_body, log_body};

/// Relays a complete `generateContent` answer.
///
/// Nothing reaches the client unless the body parses, is not blocked, and
/// reports a candidate token count.
pub async fn relay_generate<S>(
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

    let response: GenerateContentResponse =
        serde_json::from_slice(&body).map_err(RelayError::bad_response_body)?;

    if let Some(reason) = response.block_reason() {
        warn!(event = "content_blocked", trace_id = %ctx.trace_id(), reason = %reason);
        return Err(RelayError::content_filtered(reason));
    }

    let usage = response
        .usage_metadata
        .as_ref()
        .map(UsageRecord::from_gemini)
        .unwrap_or_default();

    if lacks_candidates_token_count(&body) {
        warn!(
            event = "empty_response",
            trace_id = %ctx.trace_id(),
            "usage reported without candidatesTokenCount"
        );
        return Err(RelayError::empty_response());
    }

    forward_body(ctx, downstream, status, headers, body).await;
    Ok(usage)
}
