use async_trait::async_trait;
use bytes::Bytes;
use gemrelay_provider_core::{DownstreamError, DownstreamSink, Headers};
use tokio::io::{AsyncWriteExt, Stdout};
use tracing::debug;

/// Writes the client-facing body to stdout; the head only goes to the log.
pub(crate) struct StdoutSink {
    out: Stdout,
}

impl StdoutSink {
    pub(crate) fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }
}

#[async_trait]
impl DownstreamSink for StdoutSink {
    async fn send_head(&mut self, status: u16, headers: &Headers) -> Result<(), DownstreamError> {
        debug!(event = "downstream_head", status, headers = ?headers);
        Ok(())
    }

    async fn send_body(&mut self, body: Bytes) -> Result<(), DownstreamError> {
        self.out.write_all(&body).await?;
        self.out.flush().await?;
        Ok(())
    }
}
