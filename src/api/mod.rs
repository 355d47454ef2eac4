use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::{WeatherError, models::WeatherReading, service::WeatherService};

pub type AppState = Arc<WeatherService>;

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Serialize)]
pub struct ApiHealth {
    pub status: &'static str,
    pub version: &'static str,
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        let status = match &self {
            WeatherError::Validation { .. } => StatusCode::BAD_REQUEST,
            // absence is signalled by the status alone
            WeatherError::NotFound { .. } => return StatusCode::NOT_FOUND.into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ApiError {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/weather/{city}", get(get_weather))
        .route("/weather", post(save_weather))
        .route("/health", get(health))
        .with_state(service)
}

async fn get_weather(
    State(service): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherReading>, WeatherError> {
    service
        .get_weather(&city)
        .await?
        .map(Json)
        .ok_or_else(|| WeatherError::not_found(city))
}

async fn save_weather(
    State(service): State<AppState>,
    Json(reading): Json<WeatherReading>,
) -> Result<StatusCode, WeatherError> {
    service.save_weather(reading).await?;
    Ok(StatusCode::CREATED)
}

async fn health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "ok",
        version: crate::VERSION,
    })
}
