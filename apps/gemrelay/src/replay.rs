use std::error::Error;

use bytes::Bytes;
use futures_util::stream;
use gemrelay_common::RelayConfig;
use gemrelay_provider_core::{RelayContext, UpstreamBody, UpstreamHttpResponse};
use gemrelay_provider_impl::{
    TiktokenEstimator, byte_stream_from, relay_embedding, relay_generate, relay_stream,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{ReplayArgs, ReplayMode};
use crate::stdout_sink::StdoutSink;

pub(crate) async fn run(
    config: &RelayConfig,
    args: ReplayArgs,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let raw = Bytes::from(tokio::fs::read(&args.file).await?);
    info!(file = %args.file.display(), bytes = raw.len(), "replaying upstream body");

    let ctx = RelayContext {
        trace_id: Some(format!("replay-{}", std::process::id())),
        upstream_model: args.model.clone(),
        prompt_tokens: args.prompt_tokens,
        batch_embedding: args.batch,
        debug_body: config.debug_body,
    };
    let headers = vec![("content-type".to_string(), "application/json".to_string())];
    let mut sink = StdoutSink::new();

    let usage = match args.mode {
        ReplayMode::Generate => {
            let upstream = UpstreamHttpResponse {
                status: args.status,
                headers,
                body: UpstreamBody::Bytes(raw),
            };
            relay_generate(&ctx, upstream, &mut sink).await?
        }
        ReplayMode::Embed => {
            let upstream = UpstreamHttpResponse {
                status: args.status,
                headers,
                body: UpstreamBody::Bytes(raw),
            };
            relay_embedding(&ctx, upstream, &mut sink).await?
        }
        ReplayMode::Stream => {
            let reads = split_reads(raw, args.chunk_size);
            let upstream = UpstreamHttpResponse {
                status: args.status,
                headers,
                body: UpstreamBody::Stream(byte_stream_from(stream::iter(reads), 8)),
            };
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            let outcome =
                relay_stream(&ctx, upstream, &mut sink, &TiktokenEstimator, &cancel).await?;
            info!(frames = outcome.frames_sent, "stream relayed");
            outcome.usage
        }
    };

    eprintln!("{}", serde_json::to_string(&usage)?);
    Ok(())
}

fn split_reads(raw: Bytes, chunk_size: usize) -> Vec<Result<Bytes, std::io::Error>> {
    let chunk_size = chunk_size.max(1);
    let mut reads = Vec::with_capacity(raw.len() / chunk_size + 1);
    let mut offset = 0;
    while offset < raw.len() {
        let end = (offset + chunk_size).min(raw.len());
        reads.push(Ok(raw.slice(offset..end)));
        offset = end;
    }
    reads
}
