use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{TrackId, UserId},
    protocol::{CreateTrackRequest, NewTrackout, TrackoutWavUpdate},
};
use tokio::net::TcpListener;
use track_client::{
    ClientSettings, HttpTransport, SessionIdentity, TrackActions, TrackError, TrackoutDraft,
    WavUpload,
};

#[derive(Default)]
struct FakeApi {
    next_id: i64,
    tracks: Vec<Value>,
    trackouts: Vec<Value>,
    uploads: HashMap<String, usize>,
    processing: Vec<i64>,
}

type Shared = Arc<Mutex<FakeApi>>;

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Track not found" })),
    )
}

async fn list_tracks(State(api): State<Shared>) -> Json<Value> {
    let api = api.lock().unwrap();
    Json(json!({ "payload": api.tracks }))
}

async fn create_track(State(api): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut api = api.lock().unwrap();
    api.next_id += 1;
    let track = json!({
        "id": api.next_id,
        "name": body["name"],
        "info": body["info"],
        "artist": body["artist"],
        "user_id": body["user_id"],
        "uuid": format!("uuid-{}", api.next_id),
        "compression": false,
    });
    api.tracks.push(track.clone());
    Json(json!({ "payload": track }))
}

async fn track_details(
    State(api): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let api = api.lock().unwrap();
    api.tracks
        .iter()
        .find(|t| t["id"].to_string() == id)
        .map(|t| Json(json!({ "payload": t })))
        .ok_or_else(not_found)
}

async fn update_track(
    State(api): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut api = api.lock().unwrap();
    let track = api
        .tracks
        .iter_mut()
        .find(|t| t["id"].to_string() == id)
        .ok_or_else(not_found)?;
    track["name"] = body["name"].clone();
    track["info"] = body["info"].clone();
    Ok(Json(
        json!({ "payload": { "action": "update", "table": "tracks", "id": id } }),
    ))
}

async fn delete_track(State(api): State<Shared>, Path(id): Path<String>) -> StatusCode {
    let mut api = api.lock().unwrap();
    api.tracks.retain(|t| t["id"].to_string() != id);
    StatusCode::NO_CONTENT
}

async fn list_trackouts(
    State(api): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let api = api.lock().unwrap();
    let track_id = query.get("track_id").cloned().unwrap_or_default();
    let rows: Vec<_> = api
        .trackouts
        .iter()
        .filter(|o| o["track_id"].as_str() == Some(track_id.as_str()))
        .cloned()
        .collect();
    Json(json!({ "payload": rows }))
}

async fn create_trackout(State(api): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut api = api.lock().unwrap();
    api.next_id += 1;
    let row = json!({
        "id": api.next_id,
        "track_id": body["track_id"],
        "name": body["name"],
        "type": body["type"],
        "user_id": body["user_id"],
        "settings": serde_json::to_string(&body["settings"]).unwrap(),
        "wavefile": body.get("wavefile").cloned().unwrap_or(Value::Null),
    });
    api.trackouts.push(row.clone());
    Json(row)
}

async fn process_track(
    State(api): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut api = api.lock().unwrap();
    if !api.tracks.iter().any(|t| t["id"] == id) {
        return Err(not_found());
    }
    api.processing.push(id);
    Ok(Json(
        json!({ "payload": { "action": "processing", "table": "track", "id": id } }),
    ))
}

async fn upload_wav(State(api): State<Shared>, Path(id): Path<String>, body: Bytes) -> Json<Value> {
    let mut api = api.lock().unwrap();
    api.uploads.insert(id.clone(), body.len());
    Json(json!({ "action": "upload", "table": "trackouts", "id": id.parse::<i64>().unwrap() }))
}

async fn update_trackout(
    State(api): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut api = api.lock().unwrap();
    if let Some(row) = api
        .trackouts
        .iter_mut()
        .find(|o| o["id"].to_string() == id)
    {
        if let Some(wav) = body.get("wavefile") {
            row["wavefile"] = wav.clone();
        }
    }
    Json(json!({ "action": "update", "table": "trackouts", "id": id }))
}

async fn spawn_fake_api() -> (String, Shared) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let api: Shared = Arc::default();
    let app = Router::new()
        .route("/api/tracks", get(list_tracks).post(create_track))
        .route(
            "/api/tracks/:id",
            get(track_details).put(update_track).delete(delete_track),
        )
        .route("/api/tracks/process/:id", put(process_track))
        .route("/api/trackouts", get(list_trackouts).post(create_trackout))
        .route("/api/trackouts/wav/:id", post(upload_wav))
        .route("/api/trackouts/:id", put(update_trackout))
        .with_state(api.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), api)
}

fn actions_for(base: String, identity: Arc<SessionIdentity>) -> TrackActions {
    let settings = ClientSettings {
        server_url: base,
        request_timeout_secs: 5,
        ..ClientSettings::default()
    };
    let transport = HttpTransport::from_settings(&settings).expect("transport");
    TrackActions::new(Arc::new(transport), identity)
}

#[tokio::test]
async fn full_session_against_a_fake_tracks_api() {
    let (base, api) = spawn_fake_api().await;
    let identity = Arc::new(SessionIdentity::default());
    identity.sign_in("7");
    let actions = actions_for(base, identity);

    let created = actions
        .create_track(CreateTrackRequest {
            name: "Demo".into(),
            user_id: UserId::new("7"),
            artist: "A".into(),
            info: "first take".into(),
        })
        .await
        .expect("track created");
    assert_eq!(created.name, "Demo");
    assert!(!actions.state().has_current());

    let tracks = actions.list_tracks().await.expect("list");
    assert_eq!(tracks.len(), 1);
    assert_eq!(actions.state().list, tracks);

    let current = actions
        .get_track_details(&created.id)
        .await
        .expect("details");
    assert_eq!(current.id, created.id);
    assert_eq!(current.owner_id, Some(UserId::new("7")));
    assert_eq!(current.compression, None);

    let vocals = actions
        .add_trackout(NewTrackout {
            track_id: created.id.clone(),
            name: "vocals".into(),
            kind: "vocal".into(),
            ..NewTrackout::default()
        })
        .await
        .expect("add trackout");
    let pad = actions
        .create_trackout_without_wav(TrackoutDraft {
            track_id: created.id.clone(),
            name: "pad".into(),
            kind: "synth".into(),
            wave_file_ref: None,
        })
        .await
        .expect("trackout without wav");
    assert_eq!(pad.user_id, Some(UserId::new("7")));
    assert!(pad.settings.eq.is_empty());

    let state = actions.state();
    assert_eq!(state.current.trackouts, vec![vocals.clone(), pad.clone()]);

    let refreshed = actions
        .get_trackouts(&created.id)
        .await
        .expect("trackouts");
    assert_eq!(refreshed.len(), 2);
    assert_eq!(actions.state().current.trackouts, refreshed);

    let ack = actions
        .upload_trackout_wav(WavUpload {
            trackout_id: vocals.id.clone(),
            filename: Some("vocals.wav".into()),
            bytes: vec![0x52, 0x49, 0x46, 0x46],
            content_type: None,
        })
        .await
        .expect("upload");
    assert_eq!(ack.action.as_deref(), Some("upload"));
    assert_eq!(api.lock().unwrap().uploads.get(vocals.id.as_str()), Some(&4));

    actions
        .update_trackout_with_wav(TrackoutWavUpdate {
            trackout_id: vocals.id.clone(),
            wave_file_ref: Some("/wav/vocals.wav".into()),
            ..TrackoutWavUpdate::default()
        })
        .await;
    let rows = actions.get_trackouts(&created.id).await.expect("trackouts");
    let row = rows
        .iter()
        .find(|o| o.id == vocals.id)
        .expect("vocals still listed");
    assert_eq!(row.wave_file_ref.as_deref(), Some("/wav/vocals.wav"));

    let ack = actions
        .process_track(&created.id)
        .await
        .expect("processing started");
    assert_eq!(ack.action.as_deref(), Some("processing"));
    assert_eq!(api.lock().unwrap().processing, vec![1]);

    let mut edited = actions.state().current;
    edited.name = "Demo (final)".into();
    actions.update_track(&edited).await;
    assert_eq!(actions.state().current.name, "Demo (final)");
    assert_eq!(actions.state().error, None);

    actions.delete_track(&edited).await;
    let state = actions.state();
    assert!(state.list.is_empty());
    assert_eq!(state.error, None);
    assert!(!state.loading);
    assert!(api.lock().unwrap().tracks.is_empty());
}

#[tokio::test]
async fn missing_track_reports_server_message_and_keeps_current() {
    let (base, _api) = spawn_fake_api().await;
    let actions = actions_for(base, Arc::new(SessionIdentity::default()));

    let created = actions
        .create_track(CreateTrackRequest {
            name: "Keep".into(),
            user_id: UserId::new("1"),
            artist: String::new(),
            info: String::new(),
        })
        .await
        .expect("created");
    actions
        .get_track_details(&created.id)
        .await
        .expect("details");

    let err = actions
        .get_track_details(&TrackId::new("404"))
        .await
        .expect_err("missing");
    assert_eq!(err, TrackError::server(404, "Track not found"));

    let state = actions.state();
    assert_eq!(state.current.id, created.id);
    assert_eq!(
        state.error.as_deref(),
        Some("server responded with 404: Track not found")
    );
    assert!(!state.loading);
}

#[tokio::test]
async fn trackout_without_wav_needs_a_signed_in_user() {
    let (base, api) = spawn_fake_api().await;
    let identity = Arc::new(SessionIdentity::default());
    let actions = actions_for(base, identity.clone());

    let created = actions
        .create_track(CreateTrackRequest {
            name: "Solo".into(),
            user_id: UserId::new("3"),
            artist: String::new(),
            info: String::new(),
        })
        .await
        .expect("created");
    actions
        .get_track_details(&created.id)
        .await
        .expect("details");

    let err = actions
        .create_trackout_without_wav(TrackoutDraft {
            track_id: created.id.clone(),
            name: "pad".into(),
            kind: "synth".into(),
            wave_file_ref: None,
        })
        .await
        .expect_err("anonymous");
    assert!(matches!(err, TrackError::Validation(_)));
    assert!(api.lock().unwrap().trackouts.is_empty());
    assert!(actions.state().current.trackouts.is_empty());
}
