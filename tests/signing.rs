//! Signed deliveries verified by a real receiver.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

use webhook_sender::delivery::{SendOptions, Sender};
use webhook_sender::lifecycle::Context;
use webhook_sender::security::{
    extract_from_header_map, sign_payload_at, verify_request, verify_signature, SignatureError,
    SignatureHeaders, SIGNATURE_HEADER,
};

const SECRET: &str = "whsec_integration";

#[derive(Clone, Default)]
struct Receiver {
    verified: Arc<Mutex<Vec<SignatureHeaders>>>,
}

async fn receive(State(receiver): State<Receiver>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let pairs = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)));

    match verify_request(SECRET, &body, pairs, Duration::from_secs(300)) {
        Ok(signature) => {
            receiver.verified.lock().unwrap().push(signature);
            StatusCode::NO_CONTENT
        }
        Err(_) => StatusCode::UNAUTHORIZED,
    }
}

async fn start_receiver() -> (String, Receiver) {
    let receiver = Receiver::default();
    let app = Router::new()
        .route("/webhooks", post(receive))
        .with_state(receiver.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/webhooks", addr), receiver)
}

#[tokio::test]
async fn test_receiver_accepts_signed_delivery() {
    let (url, receiver) = start_receiver().await;

    Sender::new()
        .unwrap()
        .send(
            &Context::background(),
            &url,
            &serde_json::json!({"event": "user.created", "id": "u_1"}),
            SendOptions::new().with_signature_secret(SECRET),
        )
        .await
        .unwrap();

    let verified = receiver.verified.lock().unwrap();
    assert_eq!(verified.len(), 1);
    assert!(!verified[0].id.is_empty());
}

#[tokio::test]
async fn test_receiver_rejects_wrong_secret_permanently() {
    let (url, receiver) = start_receiver().await;

    let err = Sender::new()
        .unwrap()
        .send(
            &Context::background(),
            &url,
            &serde_json::json!({"event": "user.created"}),
            SendOptions::new()
                .with_signature_secret("not-the-secret")
                .with_max_retries(3),
        )
        .await
        .unwrap_err();

    assert!(err.is_permanent());
    assert_eq!(err.status_code(), Some(401));
    assert!(receiver.verified.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_header_cannot_replace_signature() {
    let (url, receiver) = start_receiver().await;

    Sender::new()
        .unwrap()
        .send(
            &Context::background(),
            &url,
            &serde_json::json!({"a": 1}),
            SendOptions::new()
                .with_header(SIGNATURE_HEADER, "deadbeef")
                .with_signature_secret(SECRET),
        )
        .await
        .unwrap();

    assert_eq!(receiver.verified.lock().unwrap().len(), 1);
}

#[test]
fn test_known_vector() {
    let headers = sign_payload_at("s", br#"{"a":1}"#, 1_700_000_000, "id-1").unwrap();
    assert_eq!(
        headers.signature,
        "ab7bd212df57f3ef4ea3c17d4a1a71d8981ef595d4cd699b62517c68d89192a2"
    );

    let mut map = HeaderMap::new();
    for (name, value) in headers.to_pairs() {
        map.insert(
            axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
    }
    let extracted = extract_from_header_map(&map).unwrap();
    assert_eq!(extracted, headers);

    // Freshness disabled: the fixed timestamp is long past.
    verify_signature("s", br#"{"a":1}"#, &extracted, Duration::ZERO).unwrap();
    assert!(matches!(
        verify_signature("s", br#"{"a":1}"#, &extracted, Duration::from_secs(300)),
        Err(SignatureError::Expired { .. })
    ));
    assert_eq!(
        verify_signature("s", br#"{"a":2}"#, &extracted, Duration::ZERO),
        Err(SignatureError::Mismatch)
    );
}
