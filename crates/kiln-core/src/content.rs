//! Content views and byte streams.

use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Stream of content chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Content in one of its two shapes. Which shape a producer returns is
/// decided when the content is produced.
pub enum ContentView {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl ContentView {
    pub fn into_stream(self) -> ByteStream {
        match self {
            ContentView::Bytes(bytes) => once(bytes),
            ContentView::Stream(stream) => stream,
        }
    }

    /// Collect the content into one buffer.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            ContentView::Bytes(bytes) => Ok(bytes),
            ContentView::Stream(stream) => drain(stream).await,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, ContentView::Stream(_))
    }
}

impl From<Bytes> for ContentView {
    fn from(bytes: Bytes) -> Self {
        ContentView::Bytes(bytes)
    }
}

impl From<String> for ContentView {
    fn from(text: String) -> Self {
        ContentView::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for ContentView {
    fn from(text: &'static str) -> Self {
        ContentView::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl fmt::Debug for ContentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentView::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ContentView::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Single-chunk stream over a buffer.
pub fn once(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Stream whose chunks come from a stream produced by `fut`.
///
/// Nothing runs until the returned stream is first polled, so handing it
/// out never waits on `fut`.
pub fn from_future<F>(fut: F) -> ByteStream
where
    F: Future<Output = Result<ByteStream>> + Send + 'static,
{
    Box::pin(stream::once(fut).try_flatten())
}

/// Read a stream to the end.
pub async fn drain(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Decode content bytes as UTF-8 text.
pub fn decode(asset_id: &str, bytes: &Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8(asset_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(parts: &[&'static str]) -> ByteStream {
        let items: Vec<Result<Bytes>> = parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_drain_concatenates_chunks() {
        let bytes = drain(chunked(&["export ", "default ", "1;"])).await.unwrap();
        assert_eq!(&bytes[..], b"export default 1;");
    }

    #[tokio::test]
    async fn test_drain_empty_stream() {
        let bytes = drain(chunked(&[])).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_drain_propagates_chunk_error() {
        let items: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(b"a")), Err(Error::Store("reset".into()))];
        let err = drain(Box::pin(stream::iter(items))).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_from_future_is_lazy() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        let stream = from_future(async move {
            flag.store(true, Ordering::SeqCst);
            Ok(chunked(&["x"]))
        });
        assert!(!started.load(Ordering::SeqCst));
        assert_eq!(&drain(stream).await.unwrap()[..], b"x");
        assert!(started.load(Ordering::SeqCst));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode("a1", &Bytes::from_static(&[0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8(id) if id == "a1"));
    }
}
