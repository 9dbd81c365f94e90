use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(rename = "Status")]
    pub status: &'static str,
}

/// Liveness check. Never touches the database.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}
