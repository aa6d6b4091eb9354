//! `/stream1`: synthetic payload streaming.
//!
//! # Wire Format
//! ```text
//! {"chunk":N,"count":M}\n          effective parameters
//! ( 0x00 | N payload bytes ) × M    marker + chunk
//! OK                                only when every write succeeded
//! ```
//!
//! # Design Decisions
//! - Unknown fields and non-integers are a 400; keys are case-insensitive,
//!   empty values keep the default, and a repeated key takes its last value
//! - Out-of-range values are clamped after decoding, never rejected
//! - A peer that hangs up ends the stream quietly; any other write failure
//!   appends its message and ends the stream without `OK`

use axum::{
    body::Bytes,
    extract::{
        rejection::{ExtensionRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::num::ParseIntError;
use thiserror::Error;

use crate::http::request::RequestId;
use crate::http::response::{streaming_body, ChunkSink, WriteError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::payload::{StaticPayload, DEFAULT_CHUNK_SIZE, DEFAULT_COUNT, MAX_CHUNK_SIZE};

const MARKER: &[u8] = &[0x00];
const TRAILER: &[u8] = b"OK";

/// A query string `/stream1` could not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown field `{0}`, expected `chunk` or `count`")]
    UnknownField(String),

    #[error("{field}: {source}")]
    Invalid {
        field: &'static str,
        #[source]
        source: ParseIntError,
    },
}

/// Query parameters as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamQuery {
    pub chunk: i64,
    pub count: i64,
}

impl Default for StreamQuery {
    fn default() -> Self {
        Self {
            chunk: DEFAULT_CHUNK_SIZE as i64,
            count: DEFAULT_COUNT as i64,
        }
    }
}

impl StreamQuery {
    /// Decode already url-decoded `key=value` pairs.
    ///
    /// Keys match case-insensitively, an empty value keeps the default, and
    /// the last occurrence of a repeated key wins. Unknown keys are an error.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let (field, slot) = if key.eq_ignore_ascii_case("chunk") {
                ("chunk", &mut query.chunk)
            } else if key.eq_ignore_ascii_case("count") {
                ("count", &mut query.count)
            } else {
                return Err(QueryError::UnknownField(key.to_string()));
            };

            if value.is_empty() {
                continue;
            }
            *slot = value
                .parse()
                .map_err(|source| QueryError::Invalid { field, source })?;
        }

        Ok(query)
    }
}

/// Effective parameters, echoed as the response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamParams {
    pub chunk: usize,
    pub count: usize,
}

impl From<StreamQuery> for StreamParams {
    fn from(query: StreamQuery) -> Self {
        Self {
            chunk: query.chunk.clamp(0, MAX_CHUNK_SIZE as i64) as usize,
            count: query.count.max(0) as usize,
        }
    }
}

impl Default for StreamParams {
    fn default() -> Self {
        StreamQuery::default().into()
    }
}

impl StreamParams {
    /// Header line announcing these parameters.
    pub fn header(&self) -> Bytes {
        let mut line = serde_json::to_vec(self).unwrap_or_default();
        line.push(b'\n');
        Bytes::from(line)
    }

}

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// All chunks and the trailer were written.
    Completed { bytes: u64 },
    /// The client went away part way through.
    PeerClosed { bytes: u64 },
    /// A write failed; the message was sent to the client.
    Failed { bytes: u64, message: String },
}

impl StreamOutcome {
    /// Marker and payload bytes written before the stream ended.
    pub fn bytes(&self) -> u64 {
        match self {
            StreamOutcome::Completed { bytes }
            | StreamOutcome::PeerClosed { bytes }
            | StreamOutcome::Failed { bytes, .. } => *bytes,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreamOutcome::Completed { .. } => "completed",
            StreamOutcome::PeerClosed { .. } => "peer_closed",
            StreamOutcome::Failed { .. } => "failed",
        }
    }
}

/// Write a complete `/stream1` body to `sink`.
pub async fn write_stream<W: ChunkSink>(
    sink: &mut W,
    params: StreamParams,
    payload: &StaticPayload,
) -> StreamOutcome {
    let mut bytes = 0u64;

    if let Err(err) = sink.write(params.header()).await {
        return abort(sink, err, bytes).await;
    }

    let chunk = payload.prefix(params.chunk);
    for _ in 1..=params.count {
        if let Err(err) = sink.write(Bytes::from_static(MARKER)).await {
            return abort(sink, err, bytes).await;
        }
        bytes += 1;

        if chunk.is_empty() {
            continue;
        }
        if let Err(err) = sink.write(chunk.clone()).await {
            return abort(sink, err, bytes).await;
        }
        bytes += chunk.len() as u64;
    }

    if let Err(err) = sink.write(Bytes::from_static(TRAILER)).await {
        return abort(sink, err, bytes).await;
    }

    StreamOutcome::Completed { bytes }
}

async fn abort<W: ChunkSink>(sink: &mut W, err: WriteError, bytes: u64) -> StreamOutcome {
    if err.is_peer_closed() {
        return StreamOutcome::PeerClosed { bytes };
    }

    let message = err.to_string();
    // Best effort: the connection may already be unusable.
    let _ = sink.write(Bytes::from(message.clone())).await;
    StreamOutcome::Failed { bytes, message }
}

/// `GET /stream1?chunk=<int>&count=<int>`
pub async fn stream1(
    State(state): State<AppState>,
    request_id: Result<Extension<RequestId>, ExtensionRejection>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let decoded = match pairs {
        Ok(Query(pairs)) => StreamQuery::from_pairs(&pairs).map_err(|e| e.to_string()),
        Err(rejection) => Err(rejection.body_text()),
    };
    let query = match decoded {
        Ok(q) => q,
        Err(message) => {
            tracing::debug!(error = %message, "Rejected stream parameters");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    let params = StreamParams::from(query);
    let request_id = request_id.ok().map(|Extension(id)| id.to_string());

    tracing::debug!(
        request_id = request_id.as_deref().unwrap_or("-"),
        chunk = params.chunk,
        count = params.count,
        "Streaming payload"
    );

    let (mut sink, body) = streaming_body();
    let payload = state.payload.clone();

    tokio::spawn(async move {
        let outcome = write_stream(&mut sink, params, &payload).await;
        let request_id = request_id.as_deref().unwrap_or("-");

        match &outcome {
            StreamOutcome::Completed { bytes } => {
                tracing::debug!(request_id, bytes, "Stream completed");
            }
            StreamOutcome::PeerClosed { bytes } => {
                tracing::debug!(request_id, bytes, "Peer closed stream");
            }
            StreamOutcome::Failed { bytes, message } => {
                tracing::warn!(request_id, bytes, error = %message, "Stream write failed");
            }
        }

        metrics::record_stream(&outcome);
    });

    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response()
}
