//! Request metrics for API routes.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{
    conversion_action_label, conversion_format_label, normalize_path, CONVERSION_REQUESTS,
    HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Records duration and outcome of every request.
///
/// Requests to `/documents/{id}/conversions/{format}` are also counted per
/// target format and action (`start` or `cancel`).
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let raw_path = request.uri().path();
    let path = normalize_path(raw_path);
    let conversion = conversion_format_label(raw_path)
        .map(|format| (format, conversion_action_label(&method)));

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let status = response.status().as_u16().to_string();
    let labels = [method.as_str(), path.as_str(), status.as_str()];
    HTTP_REQUEST_DURATION
        .with_label_values(&labels)
        .observe(start.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();

    if let Some((format, action)) = conversion {
        CONVERSION_REQUESTS
            .with_label_values(&[format, action, status.as_str()])
            .inc();
    }

    response
}
