use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use geonames_service::location::load_dir;
use geonames_service::server::build_router;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    build_router(Arc::new(load_dir(&dir).expect("sample data loads")))
}

async fn send(req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(req).await;
    (status, body)
}

async fn with_json(method: Method, uri: &str, payload: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _, body) = send(req).await;
    (status, body)
}

fn has_country(countries: &Value, iso: &str, name: &str) -> bool {
    countries
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["iso"] == iso && c["name"] == name)
        .count()
        == 1
}

fn assert_gb_cities(cities: &Value) {
    let cities: Vec<&str> = cities.as_array().unwrap().iter().map(|c| c.as_str().unwrap()).collect();
    for city in ["London", "Manchester", "Edinburgh", "Cardiff", "Belfast"] {
        assert!(cities.contains(&city), "missing {city}");
    }
}

fn assert_error(status: StatusCode, body: &Value, expected: &str) {
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains(expected), "{msg:?} should contain {expected:?}");
    assert_eq!(body["code"], 500);
}

// ─── Countries ───────────────────────────────────────────────────

#[tokio::test]
async fn test_countries_lists_known_countries() {
    let (status, body) = get("/countries").await;
    assert_eq!(status, StatusCode::OK);
    assert!(has_country(&body, "US", "United States"));
    assert!(has_country(&body, "GB", "United Kingdom"));
    assert!(has_country(&body, "DE", "Germany"));
    assert!(has_country(&body, "GR", "Greece"));
    assert!(has_country(&body, "ZW", "Zimbabwe"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _) = get("/incorrect").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_any_origin_allowed() {
    let req = Request::builder().uri("/countries").body(Body::empty()).unwrap();
    let (_, headers, _) = send(req).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let req = Request::builder()
        .uri("/countries")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(req).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

// ─── Cities ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_cities_by_iso_code_any_case() {
    for code in ["GB", "gb", "Gb"] {
        let (status, body) = get(&format!("/cities?country={code}")).await;
        assert_eq!(status, StatusCode::OK, "{code}");
        assert_gb_cities(&body);
    }
}

#[tokio::test]
async fn test_cities_by_name_any_case() {
    for name in ["UNITED%20KINGDOM", "United%20Kingdom", "united+kingdom"] {
        let (status, body) = get(&format!("/cities?country={name}")).await;
        assert_eq!(status, StatusCode::OK, "{name}");
        assert_gb_cities(&body);
    }
}

#[tokio::test]
async fn test_cities_keep_file_order() {
    let (_, body) = get("/cities?country=GB").await;
    assert_eq!(body[0], "London");
    assert_eq!(body[9], "Belfast");
}

#[tokio::test]
async fn test_cities_from_json_body() {
    let (status, body) = with_json(Method::POST, "/cities", json!({"country": "gb"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_gb_cities(&body);

    // GET with a body, as older clients send it.
    let (status, body) = with_json(Method::GET, "/cities", json!({"country": "United Kingdom"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_gb_cities(&body);
}

#[tokio::test]
async fn test_cities_body_overrides_query() {
    let (status, body) = with_json(Method::POST, "/cities?country=DE", json!({"country": "GB"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_gb_cities(&body);
}

#[tokio::test]
async fn test_cities_unknown_country() {
    let (status, body) = get("/cities?country=Unknown").await;
    assert_error(status, &body, "Unable to find data for country");
}

#[tokio::test]
async fn test_cities_unknown_iso_code() {
    let (status, body) = get("/cities?country=zz").await;
    assert_error(status, &body, "Unknown ISO2 code: ZZ");
}

#[tokio::test]
async fn test_cities_without_country() {
    for uri in ["/cities?country", "/cities?", "/cities"] {
        let (status, body) = get(uri).await;
        assert_error(status, &body, "No country specified");
    }
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/cities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{country"))
        .unwrap();
    let (status, _, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed JSON body"));
}

// ─── Validation: country ─────────────────────────────────────────

#[tokio::test]
async fn test_valid_country_by_code_and_name() {
    for country in ["GB", "gb", "Gb", "UNITED KINGDOM", "united kingdom", "United Kingdom"] {
        let (status, body) = with_json(Method::POST, "/valid/country", json!({ "country": country })).await;
        assert_eq!(status, StatusCode::OK, "{country}");
        assert_eq!(body, json!({"valid": true}), "{country}");
    }
}

#[tokio::test]
async fn test_invalid_country_is_soft() {
    let (status, body) = with_json(Method::POST, "/valid/country", json!({"country": "Unknown"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("Unable to find data for country"));
}

#[tokio::test]
async fn test_valid_country_without_country() {
    let (status, body) = get("/valid/country").await;
    assert_error(status, &body, "No country specified");
}

// ─── Validation: city ────────────────────────────────────────────

#[tokio::test]
async fn test_valid_city() {
    let (status, body) = with_json(Method::POST, "/valid/city", json!({"country": "GB", "city": "London"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"valid": true}));
}

#[tokio::test]
async fn test_invalid_city_is_soft() {
    for city in ["Londonn", "london"] {
        let (status, body) = with_json(Method::POST, "/valid/city", json!({"country": "GB", "city": city})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false, "{city}");
        assert!(body["error"].as_str().unwrap().contains("Unable to find city"));
    }
}

#[tokio::test]
async fn test_valid_city_unknown_country_is_soft() {
    let (status, body) = get("/valid/city?country=Atlantis&city=Poseidonia").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("Unable to find data for country"));
}

#[tokio::test]
async fn test_valid_city_without_country() {
    let (status, body) = with_json(Method::POST, "/valid/city", json!({"city": "Londonn"})).await;
    assert_error(status, &body, "No country specified");
}

#[tokio::test]
async fn test_valid_city_without_city() {
    let (status, body) = with_json(Method::POST, "/valid/city", json!({"country": "GB"})).await;
    assert_error(status, &body, "No city specified");
}

#[tokio::test]
async fn test_malformed_query_string_is_json_400() {
    let req = Request::builder()
        .uri("/cities?country=gb&country=de")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(body["error"].as_str().unwrap().starts_with("Malformed query string"));
    assert_eq!(body["code"], 400);

    let (status, body) = get("/valid/city?country=gb&city=London&city=Leeds").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Malformed query string"));
}

#[tokio::test]
async fn test_array_body_is_rejected() {
    let (status, body) = with_json(Method::POST, "/valid/city", json!(["gb", "London"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed JSON body: expected an object");
}
