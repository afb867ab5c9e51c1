use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{PredictError, RouteUnavailableError};
use crate::routing::{LatLng, RouteProvider};
use crate::service::EtaPredictor;
use crate::types::InferenceRecord;

// ---------- Request/Response types ----------

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_eta: f64,
}

// [lat, lng] pairs, as the frontend sends them
#[derive(Debug, Deserialize)]
pub struct Coords {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DistanceResponse {
    pub distance_km: f64,
    pub route_coords: Vec<[f64; 2]>,
}

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn EtaPredictor>,
    pub routes: Arc<dyn RouteProvider>,
    pub log_predictions: bool,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

/// Display rounding only; the model itself returns full precision.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/get-distance", post(get_distance))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `None` (or an empty list) allows any origin.
pub fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let allow_origin = match origins {
        Some(list) if !list.is_empty() => AllowOrigin::list(
            list.iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                        None
                    }
                }),
        ),
        _ => AllowOrigin::any(),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

// ---------- Handlers ----------

async fn root() -> Json<Value> {
    Json(json!({ "message": "SmartETA API is live" }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let info = state.predictor.info();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "artifact_path": info.artifact_path,
        "trained_at": info.trained_at,
        "features": info.feature_names.len(),
    }))
}

async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<PredictResponse>, ApiError> {
    let record = InferenceRecord::from_json(&payload)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    // Debug signal to confirm what the model actually receives
    if state.log_predictions {
        log_feature_summary(state.predictor.as_ref(), &record);
    }

    let eta = state.predictor.predict(&record).map_err(|e| match e {
        PredictError::Schema(e) => api_error(StatusCode::UNPROCESSABLE_ENTITY, e),
        PredictError::Model(e) => {
            tracing::error!(error = %e, "model failed on validated record");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    })?;

    Ok(Json(PredictResponse {
        predicted_eta: round2(eta),
    }))
}

async fn get_distance(
    State(state): State<AppState>,
    Json(coords): Json<Coords>,
) -> Result<Json<DistanceResponse>, ApiError> {
    let start = LatLng::new(coords.start[0], coords.start[1]);
    let end = LatLng::new(coords.end[0], coords.end[1]);
    if !start.is_valid() || !end.is_valid() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "coordinates must be [lat, lng] with lat in [-90, 90] and lng in [-180, 180]",
        ));
    }

    let route = state.routes.route(start, end).await.map_err(|e| {
        tracing::warn!(error = %e, "route unavailable");
        let status = match e {
            RouteUnavailableError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        api_error(status, format!("route unavailable: {e}"))
    })?;

    Ok(Json(DistanceResponse {
        distance_km: round2(route.distance_km),
        route_coords: route.points.iter().map(|p| [p.lat, p.lng]).collect(),
    }))
}

fn log_feature_summary(predictor: &dyn EtaPredictor, record: &InferenceRecord) {
    let vec = match predictor.encode(record) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "could not encode record for logging");
            return;
        }
    };
    let nz = vec.iter().filter(|x| **x != 0.0).count();
    let mean = if vec.is_empty() {
        0.0
    } else {
        vec.iter().sum::<f64>() / vec.len() as f64
    };
    let std = if vec.len() < 2 {
        0.0
    } else {
        (vec.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / vec.len() as f64).sqrt()
    };
    let names = predictor.info().feature_names;
    let sample: Vec<String> = names
        .iter()
        .zip(&vec)
        .filter(|(_, v)| **v != 0.0)
        .take(6)
        .map(|(name, v)| format!("{name}={v:.3}"))
        .collect();
    tracing::info!(
        "recv weather={} in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
        record.weather,
        vec.len(),
        nz,
        mean,
        std,
        sample.join(", ")
    );
}
