use bytes::{Bytes, BytesMut};

use crate::headers::Headers;

/// Transport failure while reading an upstream body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream body read failed: {0}")]
pub struct BodyReadError(pub String);

/// Upstream chunks; an `Err` is the last item the sender produces.
pub type ByteStream = tokio::sync::mpsc::Receiver<Result<Bytes, BodyReadError>>;

#[derive(Debug)]
pub enum UpstreamBody {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl UpstreamBody {
    /// Drains the body into one buffer.
    pub async fn collect(self) -> Result<Bytes, BodyReadError> {
        match self {
            UpstreamBody::Bytes(bytes) => Ok(bytes),
            UpstreamBody::Stream(mut rx) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = rx.recv().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Turns either shape into a stream of chunks.
    pub fn into_stream(self) -> ByteStream {
        match self {
            UpstreamBody::Stream(rx) => rx,
            UpstreamBody::Bytes(bytes) => {
                let (tx, rx) = tokio::sync::mpsc::channel(1);
                if !bytes.is_empty() {
                    let _ = tx.try_send(Ok(bytes));
                }
                rx
            }
        }
    }
}

#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: UpstreamBody,
}

/// Per-request facts a translator needs besides the upstream response.
#[derive(Debug, Clone, Default)]
pub struct RelayContext {
    pub trace_id: Option<String>,
    /// Model name sent upstream; seeds the fallback token estimate.
    pub upstream_model: String,
    /// Prompt tokens counted by the gateway before dispatch.
    pub prompt_tokens: u32,
    /// Embedding request used `batchEmbedContents`.
    pub batch_embedding: bool,
    /// Log raw upstream bodies.
    pub debug_body: bool,
}

impl RelayContext {
    pub fn trace_id(&self) -> &str {
        self.trace_id.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_drains_stream() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send(Ok(Bytes::from_static(b"{\"a\""))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b":1}"))).await.unwrap();
        drop(tx);
        let body = UpstreamBody::Stream(rx).collect().await.unwrap();
        assert_eq!(&body[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn collect_surfaces_read_failure() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send(Ok(Bytes::from_static(b"{\"a\""))).await.unwrap();
        tx.send(Err(BodyReadError("connection reset".to_string())))
            .await
            .unwrap();
        drop(tx);
        let err = UpstreamBody::Stream(rx).collect().await.unwrap_err();
        assert_eq!(err.to_string(), "upstream body read failed: connection reset");
    }

    #[tokio::test]
    async fn bytes_become_single_chunk_stream() {
        let mut rx = UpstreamBody::Bytes(Bytes::from_static(b"data: {}\n\n")).into_stream();
        assert_eq!(
            rx.recv().await,
            Some(Ok(Bytes::from_static(b"data: {}\n\n")))
        );
        assert!(rx.recv().await.is_none());
    }
}
