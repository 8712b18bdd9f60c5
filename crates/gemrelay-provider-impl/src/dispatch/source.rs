use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use gemrelay_provider_core::{BodyReadError, ByteStream};
use tracing::warn;

/// Pumps a fallible byte stream (an HTTP client body, a file reader) into
/// the channel-backed `ByteStream` the translators consume.
///
/// A read error is forwarded as the final item.
pub fn byte_stream_from<S, E>(stream: S, buffer: usize) -> ByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(buffer.max(1));
    tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(event = "upstream_read_error", error = %err);
                    let _ = tx.send(Err(BodyReadError(err.to_string()))).await;
                    break;
                }
            }
        }
    });
    rx
}
