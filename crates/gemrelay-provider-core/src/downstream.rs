use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::headers::Headers;

#[derive(Debug, thiserror::Error)]
pub enum DownstreamError {
    #[error("downstream closed")]
    Closed,
    #[error("downstream io: {0}")]
    Io(#[from] std::io::Error),
}

/// Where translated output goes: the client connection in the gateway.
///
/// `send_head` is called once, before the first body write.
#[async_trait]
pub trait DownstreamSink: Send {
    async fn send_head(&mut self, status: u16, headers: &Headers) -> Result<(), DownstreamError>;

    async fn send_body(&mut self, body: Bytes) -> Result<(), DownstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamFrame {
    Head { status: u16, headers: Headers },
    Body(Bytes),
}

/// Sink that forwards frames over a channel, e.g. to an HTTP body writer
/// running on another task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DownstreamFrame>,
}

impl ChannelSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DownstreamFrame>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DownstreamSink for ChannelSink {
    async fn send_head(&mut self, status: u16, headers: &Headers) -> Result<(), DownstreamError> {
        self.tx
            .send(DownstreamFrame::Head {
                status,
                headers: headers.clone(),
            })
            .await
            .map_err(|_| DownstreamError::Closed)
    }

    async fn send_body(&mut self, body: Bytes) -> Result<(), DownstreamError> {
        self.tx
            .send(DownstreamFrame::Body(body))
            .await
            .map_err(|_| DownstreamError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_receiver_fails_writes() {
        let (mut sink, rx) = ChannelSink::new(1);
        drop(rx);
        let err = sink.send_body(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, DownstreamError::Closed));
    }
}
