//! SSE (Server-Sent Events) re-framing of backend streams.
//!
//! Each backend chunk becomes one OpenAI `chat.completion.chunk` event, in
//! backend order. A successful stream ends with a single `[DONE]` sentinel;
//! a failed one ends with a single `{"error": ...}` event and no sentinel.
//! Streams dropped before either are counted as cancelled.

use std::convert::Infallible;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::backend::{BackendChunkStream, BackendError};
use crate::metrics::{Metrics, StreamOutcome};
use crate::server::error::ErrorResponse;
use crate::translate::response::ChunkTranslator;

/// Terminal sentinel of an OpenAI event stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Records the stream outcome exactly once, when the stream is dropped.
struct OutcomeRecorder {
    metrics: Arc<Metrics>,
    outcome: Option<StreamOutcome>,
}

impl OutcomeRecorder {
    fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            outcome: None,
        }
    }

    fn finish(&mut self, outcome: StreamOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for OutcomeRecorder {
    fn drop(&mut self) {
        let outcome = self.outcome.unwrap_or(StreamOutcome::Cancelled);
        if outcome == StreamOutcome::Cancelled {
            debug!("Stream cancelled by client");
        }
        self.metrics.record_stream(outcome);
    }
}

/// Convert a backend chunk stream into OpenAI SSE events.
pub fn chunks_to_sse_stream(
    chunks: BackendChunkStream,
    translator: ChunkTranslator,
    metrics: Arc<Metrics>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let recorder = OutcomeRecorder::new(metrics);
    async_stream::stream! {
        let mut recorder = recorder;
        let mut chunks = chunks;
        let mut delivered = 0usize;

        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    let chunk = translator.translate(chunk);
                    match serde_json::to_string(&chunk) {
                        Ok(data) => {
                            delivered += 1;
                            yield Ok(Event::default().data(data));
                        }
                        Err(e) => {
                            let err = BackendError::Encode(e);
                            recorder.finish(StreamOutcome::Error);
                            yield Ok(error_event(&err));
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(delivered, error = %err, "Stream terminated by backend error");
                    recorder.finish(StreamOutcome::Error);
                    yield Ok(error_event(&err));
                    return;
                }
            }
        }

        debug!(delivered, "Stream completed");
        recorder.finish(StreamOutcome::Completed);
        yield Ok(Event::default().data(DONE_SENTINEL));
    }
}

fn error_event(err: &BackendError) -> Event {
    let data = serde_json::to_string(&ErrorResponse::from(err)).unwrap_or_default();
    Event::default().data(data)
}

/// Wrap a backend stream into an SSE HTTP response.
pub fn sse_response(
    chunks: BackendChunkStream,
    translator: ChunkTranslator,
    metrics: Arc<Metrics>,
) -> Response {
    let stream = chunks_to_sse_stream(chunks, translator, metrics);
    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();
    response
        .headers_mut()
        .insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
