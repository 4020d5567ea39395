//! Prometheus counters for the gateway.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// How a streaming response ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Error,
    /// The client went away before the stream ended.
    Cancelled,
}

impl StreamOutcome {
    fn as_str(self) -> &'static str {
        match self {
            StreamOutcome::Completed => "completed",
            StreamOutcome::Error => "error",
            StreamOutcome::Cancelled => "cancelled",
        }
    }
}

pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    backend_calls: IntCounterVec,
    streams: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("gateway_requests_total", "HTTP requests served, by route and status"),
            &["endpoint", "status"],
        )?;
        let backend_calls = IntCounterVec::new(
            Opts::new("gateway_backend_calls_total", "Signed calls issued to the Gonka API"),
            &["kind"],
        )?;
        let streams = IntCounterVec::new(
            Opts::new("gateway_streams_total", "Streaming responses, by outcome"),
            &["outcome"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(backend_calls.clone()))?;
        registry.register(Box::new(streams.clone()))?;

        Ok(Self {
            registry,
            requests,
            backend_calls,
            streams,
        })
    }

    pub fn record_request(&self, endpoint: &str, status: u16) {
        let status = status.to_string();
        self.requests
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
    }

    pub fn record_backend_call(&self, kind: &str) {
        self.backend_calls.with_label_values(&[kind]).inc();
    }

    pub fn record_stream(&self, outcome: StreamOutcome) {
        self.streams.with_label_values(&[outcome.as_str()]).inc();
    }

    /// Render all counters in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
