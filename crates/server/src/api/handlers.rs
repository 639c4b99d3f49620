use axum::{extract::State, http::header, response::IntoResponse, Json};
use convertino_core::{Config, ConversionFormat};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One supported target format.
#[derive(Debug, Serialize)]
pub struct FormatInfo {
    pub format: ConversionFormat,
    pub extension: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
    /// Extension accepted for imported sources.
    pub source_extension: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Config> {
    Json(state.config().clone())
}

pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    let formats = ConversionFormat::ALL
        .into_iter()
        .map(|format| FormatInfo {
            format,
            extension: format.extension(),
        })
        .collect();

    Json(FormatsResponse {
        formats,
        source_extension: state.config().picker.allowed_extension.clone(),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
