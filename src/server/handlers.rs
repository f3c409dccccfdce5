use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::location::{Country, LocationError, Validity};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

/// Lookup failures are reported as 500, which existing clients match on.
impl From<LocationError> for ApiError {
    fn from(err: LocationError) -> Self {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── Request parameters ──────────────────────────────────────────

/// Accepted from the query string and from a JSON body. Body wins.
#[derive(Debug, Default, Deserialize)]
pub struct LocationParams {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Query string first, then the optional JSON body on top of it.
fn extract_params(
    query: Result<Query<LocationParams>, QueryRejection>,
    body: &[u8],
) -> Result<LocationParams, ApiError> {
    let Query(query) = query.map_err(|e| {
        api_error(StatusCode::BAD_REQUEST, format!("Malformed query string: {}", e.body_text()))
    })?;
    merge_params(query, body)
}

fn merge_params(query: LocationParams, body: &[u8]) -> Result<LocationParams, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(query);
    }
    let malformed = |msg: String| api_error(StatusCode::BAD_REQUEST, format!("Malformed JSON body: {}", msg));

    // Only an object is accepted; serde would otherwise read an array positionally.
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(malformed("expected an object".into()));
    }
    let body: LocationParams = serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;

    Ok(LocationParams {
        country: body.country.or(query.country),
        city: body.city.or(query.city),
    })
}

// ─── Validation envelope ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ValidityResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Validity> for ValidityResponse {
    fn from(validity: Validity) -> Self {
        match validity {
            Validity::Valid => Self { valid: true, error: None },
            Validity::Invalid(e) => Self { valid: false, error: Some(e.to_string()) },
        }
    }
}

fn log_request<T>(
    route: &str,
    params: Option<&LocationParams>,
    result: &Result<T, ApiError>,
    start: Instant,
) {
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let country = params.and_then(|p| p.country.as_deref()).unwrap_or("");
    let city = params.and_then(|p| p.city.as_deref()).unwrap_or("");
    match result {
        Ok(_) => tracing::info!(route, country, city, elapsed_ms, "ok"),
        Err(ApiError(status, msg)) => tracing::info!(
            route,
            country,
            city,
            status = status.as_u16(),
            error = %msg,
            elapsed_ms,
            "rejected"
        ),
    }
}

fn reject<T>(route: &str, err: ApiError, start: Instant) -> Result<T, ApiError> {
    let result = Err(err);
    log_request(route, None, &result, start);
    result
}

// ─── GET /countries ──────────────────────────────────────────────

pub async fn countries(State(state): State<Arc<AppState>>) -> Json<Vec<Country>> {
    let start = Instant::now();
    let countries = state.resolver.list_countries().to_vec();

    tracing::info!(
        route = "/countries",
        count = countries.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "ok"
    );
    Json(countries)
}

// ─── GET|POST /cities ────────────────────────────────────────────

pub async fn cities(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LocationParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Vec<String>>, ApiError> {
    let start = Instant::now();
    let params = match extract_params(query, &body) {
        Ok(params) => params,
        Err(e) => return reject("/cities", e, start),
    };

    let result = state
        .resolver
        .cities_for_identifier(params.country.as_deref().unwrap_or(""))
        .map(|cities| Json(cities.to_vec()))
        .map_err(ApiError::from);

    log_request("/cities", Some(&params), &result, start);
    result
}

// ─── GET|POST /valid/country ─────────────────────────────────────

pub async fn valid_country(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LocationParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<ValidityResponse>, ApiError> {
    let start = Instant::now();
    let params = match extract_params(query, &body) {
        Ok(params) => params,
        Err(e) => return reject("/valid/country", e, start),
    };

    let result = state
        .resolver
        .validate_country(params.country.as_deref())
        .map(|v| Json(ValidityResponse::from(v)))
        .map_err(ApiError::from);

    log_request("/valid/country", Some(&params), &result, start);
    result
}

// ─── GET|POST /valid/city ────────────────────────────────────────

pub async fn valid_city(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LocationParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<ValidityResponse>, ApiError> {
    let start = Instant::now();
    let params = match extract_params(query, &body) {
        Ok(params) => params,
        Err(e) => return reject("/valid/city", e, start),
    };

    let result = state
        .resolver
        .validate_city(params.country.as_deref(), params.city.as_deref())
        .map(|v| Json(ValidityResponse::from(v)))
        .map_err(ApiError::from);

    log_request("/valid/city", Some(&params), &result, start);
    result
}
