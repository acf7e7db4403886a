use super::*;

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use shared::protocol::Track;
use tokio::net::TcpListener;

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({ "payload": { "authorization": auth } }))
}

async fn echo_query(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "payload": query }))
}

async fn echo_upload(Path(id): Path<String>, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "id": id, "size": body.len(), "content_type": content_type }))
}

async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "track missing" })))
}

async fn crashed() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "")
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn plain_text() -> &'static str {
    "ok"
}

async fn spawn_echo_server() -> Result<String, std::io::Error> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/auth", get(echo_auth))
        .route("/api/trackouts", get(echo_query))
        .route("/api/trackouts/wav/:id", post(echo_upload))
        .route("/api/tracks/404", get(missing))
        .route("/api/tracks/500", get(crashed))
        .route("/api/tracks/:id", delete(no_content))
        .route("/api/text", get(plain_text));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

#[tokio::test]
async fn attaches_bearer_token_when_configured() {
    let base = spawn_echo_server().await.expect("spawn server");

    let anonymous = HttpTransport::new(base.clone());
    let body = anonymous.send(ApiRequest::get("/auth")).await.expect("send");
    assert_eq!(body["payload"]["authorization"], Value::Null);

    let authed = HttpTransport::new(base).with_auth_token("secret-token");
    let body = authed.send(ApiRequest::get("/auth")).await.expect("send");
    assert_eq!(body["payload"]["authorization"], "Bearer secret-token");
}

#[tokio::test]
async fn encodes_query_parameters() {
    let base = spawn_echo_server().await.expect("spawn server");
    let transport = HttpTransport::new(format!("{base}/"));

    let body = transport
        .send(ApiRequest::get("trackouts").with_query("track_id", "t 1"))
        .await
        .expect("send");
    assert_eq!(body["payload"]["track_id"], "t 1");
}

#[tokio::test]
async fn sends_binary_bodies_with_their_content_type() {
    let base = spawn_echo_server().await.expect("spawn server");
    let transport = HttpTransport::new(base);

    let body = transport
        .send(ApiRequest::post_bytes(
            "/trackouts/wav/7",
            vec![1, 2, 3, 4],
            "audio/wav",
        ))
        .await
        .expect("send");
    assert_eq!(body, json!({ "id": "7", "size": 4, "content_type": "audio/wav" }));
}

#[tokio::test]
async fn non_success_status_becomes_server_error_with_body_message() {
    let base = spawn_echo_server().await.expect("spawn server");
    let transport = HttpTransport::new(base);

    let err = transport
        .send(ApiRequest::get("/tracks/404"))
        .await
        .expect_err("404 must fail");
    assert_eq!(err, TrackError::server(404, "track missing"));

    let err = transport
        .send(ApiRequest::get("/tracks/500"))
        .await
        .expect_err("500 must fail");
    assert_eq!(err, TrackError::server(500, "Internal Server Error"));
}

#[tokio::test]
async fn empty_and_plain_bodies_are_still_values() {
    let base = spawn_echo_server().await.expect("spawn server");
    let transport = HttpTransport::new(base);

    let body = transport
        .send(ApiRequest::delete("/tracks/9"))
        .await
        .expect("send");
    assert_eq!(body, Value::Null);

    let body = transport.send(ApiRequest::get("/text")).await.expect("send");
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let transport = HttpTransport::new(format!("http://{addr}"));
    let err = transport
        .send(ApiRequest::get("/tracks"))
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, TrackError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn transport_from_settings_uses_configured_url_and_token() {
    let base = spawn_echo_server().await.expect("spawn server");
    let settings = ClientSettings {
        server_url: base,
        auth_token: Some("from-settings".into()),
        user_id: None,
        request_timeout_secs: 5,
    };

    let transport = HttpTransport::from_settings(&settings).expect("build transport");
    let body = transport.send(ApiRequest::get("/auth")).await.expect("send");
    assert_eq!(body["payload"]["authorization"], "Bearer from-settings");
}

#[test]
fn decode_respects_the_declared_shape() {
    let enveloped = json!({ "payload": { "id": 1, "name": "Demo" } });
    let track: Body<Track> = ResponseShape::Enveloped
        .decode(enveloped.clone())
        .expect("enveloped decode");
    assert!(matches!(&track, Body::Enveloped(t) if t.name == "Demo"));

    let err = ResponseShape::Raw
        .decode::<Track>(enveloped)
        .expect_err("an envelope is not a bare track");
    assert!(matches!(err, TrackError::UnexpectedResponse(_)));

    let err = ResponseShape::Enveloped
        .decode::<Track>(json!({ "id": 1, "name": "Demo" }))
        .expect_err("a bare track is not an envelope");
    assert!(matches!(err, TrackError::UnexpectedResponse(_)));

    let bare: Track = ResponseShape::Raw
        .decode(json!({ "id": 1, "name": "Demo" }))
        .expect("raw decode")
        .into_inner();
    assert_eq!(bare.id.as_str(), "1");

    let wrapped: Body<Track> = ResponseShape::Either
        .decode(json!({ "payload": { "id": 2, "name": "Wrapped" } }))
        .expect("either accepts an envelope");
    assert!(matches!(&wrapped, Body::Enveloped(t) if t.id.as_str() == "2"));
    let unwrapped: Body<Track> = ResponseShape::Either
        .decode(json!({ "id": 3, "name": "Bare" }))
        .expect("either accepts a bare body");
    assert!(matches!(&unwrapped, Body::Raw(t) if t.id.as_str() == "3"));
}
