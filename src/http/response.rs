//! Streaming response plumbing.
//!
//! # Responsibilities
//! - Define the `ChunkSink` seam responders write through
//! - Classify write failures (peer gone vs. anything else)
//! - Bridge a producer task to an axum response body
//!
//! # Design Decisions
//! - Bounded channel of capacity 1: a write completes only once the body has
//!   taken the previous frame, so producers advance at transport speed
//! - A dropped body means hyper gave up on the connection, reported as
//!   `WriteError::PeerClosed`; the channel sink has no other failure, so
//!   `WriteError::Io` only comes from sinks writing to real I/O

use std::convert::Infallible;
use std::future::Future;
use std::io;

use axum::body::{Body, Bytes};
use futures_util::stream;
use thiserror::Error;
use tokio::sync::mpsc;

/// Frames buffered between a producer and the response body.
const CHANNEL_CAPACITY: usize = 1;

/// A failed write to the response.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The client closed its side of the connection.
    #[error("peer closed the stream")]
    PeerClosed,

    /// Any other I/O failure.
    #[error(transparent)]
    Io(io::Error),
}

impl WriteError {
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, WriteError::PeerClosed)
    }
}

/// Destination for response bytes.
pub trait ChunkSink: Send {
    /// Write one frame, suspending until the sink accepts it.
    fn write(&mut self, data: Bytes) -> impl Future<Output = Result<(), WriteError>> + Send;
}

/// Sink feeding a response body created by [`streaming_body`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChunkSink for ChannelSink {
    async fn write(&mut self, data: Bytes) -> Result<(), WriteError> {
        self.tx.send(data).await.map_err(|_| WriteError::PeerClosed)
    }
}

/// Create a response body that yields whatever is written to the returned sink.
///
/// The body ends when every clone of the sink has been dropped.
pub fn streaming_body() -> (ChannelSink, Body) {
    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

    let frames = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|frame| (Ok::<_, Infallible>(frame), rx))
    });

    (ChannelSink { tx }, Body::from_stream(frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_display_their_message() {
        let err = WriteError::Io(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        assert!(!err.is_peer_closed());
        assert_eq!(err.to_string(), "disk on fire");
        assert!(WriteError::PeerClosed.is_peer_closed());
    }

    #[tokio::test]
    async fn body_yields_written_frames() {
        let (mut sink, body) = streaming_body();

        let producer = tokio::spawn(async move {
            sink.write(Bytes::from_static(b"hello ")).await.unwrap();
            sink.write(Bytes::from_static(b"world")).await.unwrap();
        });

        let collected = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        producer.await.unwrap();
        assert_eq!(&collected[..], b"hello world");
    }

    #[tokio::test]
    async fn dropped_body_reports_peer_closed() {
        let (mut sink, body) = streaming_body();
        drop(body);

        let err = sink.write(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(err.is_peer_closed());
    }
}
