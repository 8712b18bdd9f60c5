use gemrelay_protocol::gemini::GenerateContentResponse;
use gemrelay_protocol::sse::data_frame;
use gemrelay_provider_core::{
    DownstreamError, DownstreamSink, Headers, RelayContext, RelayError, RelayResult,
    UpstreamHttpResponse, UsageRecord, set_event_stream_headers,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::IMAGE_COMPLETION_TOKENS;
use crate::dispatch::StreamDecoder;
use crate::tokenizer::TextTokenEstimator;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lookahead {
    AwaitingFirst,
    /// First chunk was an empty thought; held until the next chunk shows
    /// whether a safety block follows.
    Pending(String),
    Flowing,
}

/// What to do with one upstream payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkAction {
    /// Keep the payload back; nothing is written.
    Hold,
    /// Write `released` (a previously held payload) first, then `current`.
    Forward {
        released: Option<String>,
        current: String,
    },
    /// Stop reading; the held payload is discarded.
    Block { reason: String },
    /// Unparseable payload, skipped.
    Drop,
}

/// Per-request state of a Gemini stream.
#[derive(Debug)]
pub struct StreamSession {
    lookahead: Lookahead,
    text: String,
    image_count: u32,
    usage: UsageRecord,
    block_reason: Option<String>,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            lookahead: Lookahead::AwaitingFirst,
            text: String::new(),
            image_count: 0,
            usage: UsageRecord::default(),
            block_reason: None,
        }
    }

    pub fn on_chunk(&mut self, ctx: &RelayContext, raw: &str) -> ChunkAction {
        let chunk: GenerateContentResponse = match serde_json::from_str(raw) {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(event = "stream_chunk_invalid", trace_id = %ctx.trace_id(), error = %err);
                return ChunkAction::Drop;
            }
        };

        if let Some(reason) = chunk.block_reason() {
            if matches!(self.lookahead, Lookahead::Pending(_)) {
                warn!(
                    event = "content_blocked",
                    trace_id = %ctx.trace_id(),
                    reason = %reason,
                    "blocked after an empty thought chunk"
                );
                self.lookahead = Lookahead::Flowing;
                self.block_reason = Some(reason.to_string());
                return ChunkAction::Block {
                    reason: reason.to_string(),
                };
            }
            warn!(
                event = "content_blocked",
                trace_id = %ctx.trace_id(),
                reason = %reason,
                "blocked after the stream started"
            );
        }

        let released = match std::mem::replace(&mut self.lookahead, Lookahead::Flowing) {
            Lookahead::AwaitingFirst if chunk.is_empty_thought() => {
                debug!(event = "stream_chunk_held", trace_id = %ctx.trace_id());
                self.lookahead = Lookahead::Pending(raw.to_string());
                return ChunkAction::Hold;
            }
            Lookahead::Pending(held) => {
                debug!(event = "stream_chunk_released", trace_id = %ctx.trace_id());
                self.absorb_raw(&held);
                Some(held)
            }
            Lookahead::AwaitingFirst | Lookahead::Flowing => None,
        };

        self.absorb(&chunk);
        ChunkAction::Forward {
            released,
            current: raw.to_string(),
        }
    }

    /// Hands back a still-held payload once the upstream has ended.
    pub fn take_pending(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.lookahead, Lookahead::Flowing) {
            Lookahead::Pending(held) => {
                self.absorb_raw(&held);
                Some(held)
            }
            other => {
                self.lookahead = other;
                None
            }
        }
    }

    /// Forgets a held payload without sending it.
    pub fn discard_pending(&mut self) {
        if matches!(self.lookahead, Lookahead::Pending(_)) {
            self.lookahead = Lookahead::Flowing;
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.block_reason.is_some()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// Final usage once reading has stopped. `sent` counts frames the
    /// client actually received.
    pub fn resolve(
        self,
        ctx: &RelayContext,
        sent: usize,
        estimator: &dyn TextTokenEstimator,
    ) -> RelayResult<UsageRecord> {
        if let Some(reason) = self.block_reason {
            return Err(RelayError::content_filtered(&reason));
        }
        if sent == 0 {
            return Err(RelayError::empty_stream());
        }

        let mut usage = self.usage;
        if self.image_count > 0 && usage.completion_tokens == 0 {
            usage.completion_tokens = self.image_count.saturating_mul(IMAGE_COMPLETION_TOKENS);
            usage.total_tokens = usage.prompt_tokens.saturating_add(usage.completion_tokens);
        }
        if usage.completion_tokens == 0 {
            usage = if self.text.is_empty() {
                UsageRecord::default()
            } else {
                let completion = estimator.count_tokens(&ctx.upstream_model, &self.text);
                UsageRecord::estimated(ctx.prompt_tokens, completion)
            };
        }
        Ok(usage)
    }

    fn absorb_raw(&mut self, raw: &str) {
        if let Ok(chunk) = serde_json::from_str::<GenerateContentResponse>(raw) {
            self.absorb(&chunk);
        }
    }

    fn absorb(&mut self, chunk: &GenerateContentResponse) {
        for part in chunk.parts() {
            if part.has_media() {
                self.image_count = self.image_count.saturating_add(1);
            }
            if let Some(text) = part.visible_text() {
                self.text.push_str(text);
            }
        }
        if let Some(usage) = chunk
            .usage_metadata
            .as_ref()
            .filter(|usage| usage.total() != 0)
        {
            self.usage.apply_gemini(usage);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub usage: UsageRecord,
    pub frames_sent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Eof,
    Blocked,
    Cancelled,
    ClientGone,
}

/// Writes `data:` frames, sending the event-stream head before the first.
struct FrameWriter<'a, S: ?Sized> {
    sink: &'a mut S,
    headers: Headers,
    head_sent: bool,
    sent: usize,
}

impl<'a, S> FrameWriter<'a, S>
where
    S: DownstreamSink + ?Sized,
{
    fn new(sink: &'a mut S) -> Self {
        let mut headers = Headers::new();
        set_event_stream_headers(&mut headers);
        Self {
            sink,
            headers,
            head_sent: false,
            sent: 0,
        }
    }

    async fn write(&mut self, payload: &str) -> Result<(), DownstreamError> {
        if !self.head_sent {
            self.sink.send_head(200, &self.headers).await?;
            self.head_sent = true;
        }
        self.sink.send_body(data_frame(payload)).await?;
        self.sent += 1;
        Ok(())
    }
}

/// Relays a `streamGenerateContent` body chunk by chunk.
///
/// The first chunk is held back when it is an empty thought, so that a
/// safety block arriving right behind it can still be reported as a clean
/// `ContentFiltered` error with nothing sent. Cancellation stops reading at
/// once; usage is still resolved from what was already relayed.
pub async fn relay_stream<S>(
    ctx: &RelayContext,
    upstream: UpstreamHttpResponse,
    downstream: &mut S,
    estimator: &dyn TextTokenEstimator,
    cancel: &CancellationToken,
) -> RelayResult<StreamOutcome>
where
    S: DownstreamSink + ?Sized,
{
    let mut rx = upstream.body.into_stream();
    let mut decoder = StreamDecoder::new();
    let mut session = StreamSession::new();
    let mut writer = FrameWriter::new(downstream);

    let stop = 'read: loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break 'read Stop::Cancelled,
            chunk = rx.recv() => chunk,
        };
        let (eof, payloads) = match chunk {
            Some(Ok(bytes)) => (false, decoder.push(&bytes)),
            Some(Err(err)) => {
                warn!(event = "upstream_read_failed", trace_id = %ctx.trace_id(), error = %err);
                (true, decoder.finish())
            }
            None => (true, decoder.finish()),
        };

        for payload in payloads {
            if ctx.debug_body {
                debug!(event = "upstream_chunk", trace_id = %ctx.trace_id(), body = %payload);
            }
            match session.on_chunk(ctx, &payload) {
                ChunkAction::Hold | ChunkAction::Drop => {}
                ChunkAction::Block { .. } => break 'read Stop::Blocked,
                ChunkAction::Forward { released, current } => {
                    for frame in released.iter().chain(std::iter::once(&current)) {
                        if let Err(err) = writer.write(frame).await {
                            warn!(
                                event = "downstream_write_failed",
                                trace_id = %ctx.trace_id(),
                                error = %err,
                            );
                            break 'read Stop::ClientGone;
                        }
                    }
                }
            }
        }

        if eof {
            break Stop::Eof;
        }
    };
    drop(rx);

    match stop {
        Stop::Eof => {
            if let Some(held) = session.take_pending() {
                if let Err(err) = writer.write(&held).await {
                    warn!(event = "downstream_write_failed", trace_id = %ctx.trace_id(), error = %err);
                }
            }
        }
        Stop::Cancelled => {
            info!(event = "stream_cancelled", trace_id = %ctx.trace_id(), sent = writer.sent);
            session.discard_pending();
        }
        Stop::Blocked | Stop::ClientGone => {}
    }

    let frames_sent = writer.sent;
    let usage = session.resolve(ctx, frames_sent, estimator)?;
    Ok(StreamOutcome { usage, frames_sent })
}
