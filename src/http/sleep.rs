//! `/sleep`: hold a request open for a fixed delay.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::http::response::{streaming_body, ChunkSink};
use crate::http::server::AppState;

/// `GET /sleep`
///
/// Writes an acknowledgement at once, then `OK` after the configured delay.
/// Only this request waits; write failures are ignored.
pub async fn sleep(State(state): State<AppState>) -> Response {
    let delay = state.sleep;
    let (mut sink, body) = streaming_body();

    tokio::spawn(async move {
        let ack = format!("sleeping for {}", describe(delay));
        if sink.write(Bytes::from(ack)).await.is_err() {
            return;
        }

        tokio::time::sleep(delay).await;
        let _ = sink.write(Bytes::from_static(b"OK")).await;
    });

    body.into_response()
}

/// Human readable delay, e.g. `1 minute` or `250 milliseconds`.
fn describe(delay: Duration) -> String {
    fn plural(n: u128, unit: &str) -> String {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    }

    let millis = delay.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        plural(millis / 60_000, "minute")
    } else if millis % 1000 == 0 {
        plural(millis / 1000, "second")
    } else {
        plural(millis, "millisecond")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_delays() {
        assert_eq!(describe(Duration::from_secs(60)), "1 minute");
        assert_eq!(describe(Duration::from_secs(120)), "2 minutes");
        assert_eq!(describe(Duration::from_secs(5)), "5 seconds");
        assert_eq!(describe(Duration::from_secs(1)), "1 second");
        assert_eq!(describe(Duration::from_millis(250)), "250 milliseconds");
        assert_eq!(describe(Duration::ZERO), "0 seconds");
    }
}
