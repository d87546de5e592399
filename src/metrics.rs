//! Prometheus metrics

use axum::{body::Body, http::Request, response::Response};
use lazy_static::lazy_static;
use prometheus::{self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::Span;

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Simple request counter
    pub static ref INCOMING_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("incoming_requests", "The number of HTTP requests received"),
        &["http_method"]
    ).expect("metric can be created");
    // Request counter by status code
    pub static ref RESPONSE_CODE_COLLECTOR: IntCounterVec = IntCounterVec::new(
        Opts::new("outgoing_response", "The number of responses sent."),
        &["status_code"]
    ).expect("metric can be created");
    // Request histogram by response time
    pub static ref RESPONSE_TIME_COLLECTOR: HistogramVec = HistogramVec::new(
        HistogramOpts{
            common_opts: Opts::new("response_time", "The time taken to respond to each request"),
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        },
        &[],
    ).expect("metric can be created");
}

/// Register all collectors with [REGISTRY]. Call once at startup.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(INCOMING_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(RESPONSE_CODE_COLLECTOR.clone()))?;
    REGISTRY.register(Box::new(RESPONSE_TIME_COLLECTOR.clone()))?;
    Ok(())
}

/// Render the registered metrics in the Prometheus text format.
pub async fn metrics_handler() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("failed to encode metrics: {err}");
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

/// Increments the prometheus counter on all incoming requests, labelled by http method
pub fn request_counter(request: &Request<Body>, _span: &Span) {
    INCOMING_REQUESTS
        .with_label_values(&[&request.method().as_str().to_ascii_uppercase()])
        .inc();
}

/// Increment the prometheus counter on all outgoing responses, labelled by status code
pub fn record_response_metrics<B>(
    response: &Response<B>,
    latency: std::time::Duration,
    _span: &Span,
) {
    RESPONSE_CODE_COLLECTOR
        .with_label_values(&[response.status().as_str()])
        .inc();

    RESPONSE_TIME_COLLECTOR
        .with_label_values(&[])
        .observe(latency.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{Method, StatusCode};

    #[test]
    fn counts_requests_by_method() {
        let before = INCOMING_REQUESTS.with_label_values(&["DELETE"]).get();
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/students/1")
            .body(Body::empty())
            .unwrap();
        request_counter(&request, &Span::none());
        assert_eq!(
            before + 1,
            INCOMING_REQUESTS.with_label_values(&["DELETE"]).get()
        );
    }

    #[test]
    fn counts_responses_by_status() {
        let before = RESPONSE_CODE_COLLECTOR.with_label_values(&["418"]).get();
        let response = axum::http::Response::builder()
            .status(StatusCode::IM_A_TEAPOT)
            .body(())
            .unwrap();
        record_response_metrics(&response, std::time::Duration::from_millis(3), &Span::none());
        assert_eq!(
            before + 1,
            RESPONSE_CODE_COLLECTOR.with_label_values(&["418"]).get()
        );
    }
}
