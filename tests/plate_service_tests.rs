//! PlateRecognizerClient against a local HTTP endpoint.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use platescan_lib::config::PlateServiceConfig;
use platescan_lib::remote::PlateRecognizerClient;
use platescan_lib::{PlateGuess, PlateService, PlateServiceError};

#[derive(Clone, Default)]
struct Seen {
    authorization: Arc<Mutex<Option<String>>>,
    body: Arc<Mutex<String>>,
}

async fn plate_reader(State(seen): State<Seen>, headers: HeaderMap, body: String) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *seen.authorization.lock().unwrap() = auth.clone();
    *seen.body.lock().unwrap() = body;

    if auth.as_deref() != Some("Token good-key") {
        return (StatusCode::FORBIDDEN, Json(json!({"detail": "Invalid token."})));
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "processing_time": 88.1,
            "results": [
                {"plate": "nbk4521", "score": 0.87, "candidates": []},
                {"plate": "nbk452l", "score": 0.31}
            ]
        })),
    )
}

async fn failing() -> (StatusCode, &'static str) {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1/plate-reader/")
}

fn client(endpoint: String, api_key: &str) -> PlateRecognizerClient {
    PlateRecognizerClient::new(&PlateServiceConfig {
        api_key: api_key.to_string(),
        endpoint,
        regions: vec!["us-ca".to_string()],
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn returns_guesses_in_service_order() {
    let seen = Seen::default();
    let router = Router::new()
        .route("/v1/plate-reader/", post(plate_reader))
        .with_state(seen.clone());
    let endpoint = serve(router).await;

    let guesses = client(endpoint, "good-key").recognize_plate(b"jpeg-bytes").await.unwrap();

    assert_eq!(
        guesses,
        vec![
            PlateGuess { plate: "nbk4521".into(), score: 0.87 },
            PlateGuess { plate: "nbk452l".into(), score: 0.31 },
        ]
    );
    assert_eq!(seen.authorization.lock().unwrap().as_deref(), Some("Token good-key"));
    let body = seen.body.lock().unwrap().clone();
    assert!(body.contains("upload=anBlZy1ieXRlcw%3D%3D"), "{body}");
    assert!(body.contains("regions=us-ca"), "{body}");
}

#[tokio::test]
async fn rejected_key_is_reported() {
    let router = Router::new()
        .route("/v1/plate-reader/", post(plate_reader))
        .with_state(Seen::default());
    let endpoint = serve(router).await;

    let err = client(endpoint, "bad-key").recognize_plate(b"x").await.unwrap_err();
    assert!(matches!(err, PlateServiceError::InvalidApiKey));
}

#[tokio::test]
async fn http_error_carries_status_and_body() {
    let endpoint = serve(Router::new().route("/v1/plate-reader/", post(failing))).await;

    let err = client(endpoint, "good-key").recognize_plate(b"x").await.unwrap_err();
    match err {
        PlateServiceError::Api(status, body) => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{addr}/"), "good-key")
        .recognize_plate(b"x")
        .await
        .unwrap_err();
    assert!(matches!(err, PlateServiceError::Network(_) | PlateServiceError::Timeout));
}
