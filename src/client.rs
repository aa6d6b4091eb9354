//! Client-side checking of `/stream1` bodies.
//!
//! [`StreamVerifier`] consumes a body incrementally, in whatever pieces the
//! transport delivers, and checks the framing: header line, `count` segments
//! of marker + chunk, then the `OK` trailer.

use thiserror::Error;

use crate::http::stream::StreamParams;

/// Longest header line accepted before giving up.
const MAX_HEADER_LEN: usize = 256;

/// Longest trailer kept for error reporting.
const MAX_TRAILER_LEN: usize = 4096;

/// Framing problems found in a body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed header: {0}")]
    Header(String),

    #[error("segment {segment}: expected marker 0x00, found {found:#04x}")]
    Marker { segment: usize, found: u8 },

    #[error("stream ended after {segments} of {expected} segments")]
    Truncated { segments: usize, expected: usize },

    #[error("unexpected trailer: {0:?}")]
    Trailer(String),
}

/// Summary of a verified body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    pub params: StreamParams,
    pub segments: usize,
    /// Marker and chunk bytes, excluding header and trailer.
    pub payload_bytes: u64,
}

#[derive(Debug)]
enum State {
    Header,
    Marker,
    Chunk { remaining: usize },
    Trailer,
}

/// Incremental `/stream1` body checker.
#[derive(Debug)]
pub struct StreamVerifier {
    state: State,
    header: Vec<u8>,
    params: Option<StreamParams>,
    segments: usize,
    payload_bytes: u64,
    trailer: Vec<u8>,
}

impl Default for StreamVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamVerifier {
    pub fn new() -> Self {
        Self {
            state: State::Header,
            header: Vec::new(),
            params: None,
            segments: 0,
            payload_bytes: 0,
            trailer: Vec::new(),
        }
    }

    /// Feed the next piece of the body.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<(), VerifyError> {
        while !data.is_empty() {
            match self.state {
                State::Header => {
                    match data.iter().position(|b| *b == b'\n') {
                        Some(end) => {
                            self.header.extend_from_slice(&data[..end]);
                            data = &data[end + 1..];
                            self.parse_header()?;
                        }
                        None => {
                            self.header.extend_from_slice(data);
                            data = &[];
                        }
                    }
                    if self.header.len() > MAX_HEADER_LEN {
                        return Err(VerifyError::Header("header line too long".into()));
                    }
                }
                State::Marker => {
                    if data[0] != 0 {
                        return Err(VerifyError::Marker {
                            segment: self.segments,
                            found: data[0],
                        });
                    }
                    data = &data[1..];
                    self.payload_bytes += 1;
                    let chunk = self.expected().chunk;
                    if chunk == 0 {
                        self.finish_segment();
                    } else {
                        self.state = State::Chunk { remaining: chunk };
                    }
                }
                State::Chunk { remaining } => {
                    let take = remaining.min(data.len());
                    data = &data[take..];
                    self.payload_bytes += take as u64;
                    if take == remaining {
                        self.finish_segment();
                    } else {
                        self.state = State::Chunk {
                            remaining: remaining - take,
                        };
                    }
                }
                State::Trailer => {
                    let room = MAX_TRAILER_LEN.saturating_sub(self.trailer.len());
                    self.trailer.extend_from_slice(&data[..room.min(data.len())]);
                    data = &[];
                }
            }
        }
        Ok(())
    }

    /// Check the end of the body and produce the report.
    pub fn finish(self) -> Result<StreamReport, VerifyError> {
        let params = match (&self.state, self.params) {
            (State::Header, _) | (_, None) => {
                return Err(VerifyError::Header("stream ended before header".into()))
            }
            (State::Trailer, Some(params)) => params,
            (_, Some(params)) => {
                return Err(VerifyError::Truncated {
                    segments: self.segments,
                    expected: params.count,
                })
            }
        };

        if self.trailer != b"OK" {
            return Err(VerifyError::Trailer(
                String::from_utf8_lossy(&self.trailer).into_owned(),
            ));
        }

        Ok(StreamReport {
            params,
            segments: self.segments,
            payload_bytes: self.payload_bytes,
        })
    }

    fn parse_header(&mut self) -> Result<(), VerifyError> {
        let params: StreamParams = serde_json::from_slice(&self.header)
            .map_err(|e| VerifyError::Header(e.to_string()))?;

        self.params = Some(params);
        self.state = if params.count == 0 {
            State::Trailer
        } else {
            State::Marker
        };
        Ok(())
    }

    fn finish_segment(&mut self) {
        self.segments += 1;
        self.state = if self.segments == self.expected().count {
            State::Trailer
        } else {
            State::Marker
        };
    }

    fn expected(&self) -> StreamParams {
        // Only called after the header has been parsed.
        self.params.unwrap_or(StreamParams { chunk: 0, count: 0 })
    }
}
