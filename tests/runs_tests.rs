// tests/runs_tests.rs

use std::sync::Arc;

use brightsteps::{
    config::{Config, RecorderSink},
    routes,
    runtime::{RunRegistry, recorder::SessionRecorder},
    state::AppState,
    store::{LocalSessionStore, SessionStore},
};
use sqlx::sqlite::SqlitePoolOptions;

/// Spawns the app with the local file sink. Returns the base URL.
async fn spawn_app(sessions_dir: &std::path::Path) -> String {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "runs_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        recorder: RecorderSink::Local,
        local_store_dir: sessions_dir.to_path_buf(),
        log_dir: std::env::temp_dir().display().to_string(),
        run_idle_secs: 60,
    };

    let store: Arc<dyn SessionStore> = Arc::new(LocalSessionStore::new(sessions_dir));
    let state = AppState::new(pool, config, RunRegistry::new(SessionRecorder::new(store)));
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn token_for(client: &reqwest::Client, address: &str, username: &str) -> String {
    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({"username": username, "password": "password123"}))
        .send()
        .await
        .unwrap();

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"username": username, "password": "password123"}))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    login["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn run_lifecycle_over_http() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let address = spawn_app(dir.path()).await;
    let client = reqwest::Client::new();
    let token = token_for(&client, &address, "runner").await;
    let auth = format!("Bearer {}", token);

    // 1. Create a run; it waits in `ready`
    let created = client
        .post(format!("{}/api/runs", address))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "activity": "number_echo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let run: serde_json::Value = created.json().await.unwrap();
    let id = run["id"].as_str().unwrap().to_string();
    assert_eq!(run["state"]["phase"]["phase"], "ready");
    assert_eq!(run["state"]["phase"]["level"], 1);
    assert!(run["state"]["stimulus"].is_null());

    // 2. Responding before the start is a conflict
    let early = client
        .post(format!("{}/api/runs/{}/respond", address, id))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "answer": { "type": "press" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status().as_u16(), 409);

    // 3. Start: the digit sequence is on screen
    let shown: serde_json::Value = client
        .post(format!("{}/api/runs/{}/start", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(shown["state"]["phase"]["phase"], "showing");
    let stimulus = shown["state"]["stimulus"].as_array().unwrap();
    assert_eq!(stimulus.len(), 3);
    assert_eq!(stimulus[0]["kind"], "digit");

    // 4. Answering while the sequence is still shown is premature
    let answered: serde_json::Value = client
        .post(format!("{}/api/runs/{}/respond", address, id))
        .header("Authorization", &auth)
        .json(&serde_json::json!({ "answer": { "type": "recall", "symbols": stimulus } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answered["state"]["phase"]["phase"], "feedback");
    assert_eq!(answered["state"]["phase"]["outcome"], "premature");
    assert_eq!(answered["state"]["score"], 0);

    // 5. Pause then resume
    let paused: serde_json::Value = client
        .post(format!("{}/api/runs/{}/pause", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paused["state"]["phase"]["phase"], "paused");

    let resumed: serde_json::Value = client
        .post(format!("{}/api/runs/{}/resume", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resumed["state"]["phase"]["phase"], "showing");
    assert_eq!(resumed["state"]["phase"]["trial"], 1);

    // 6. Saving an unfinished run is refused
    let record = client
        .post(format!("{}/api/runs/{}/record", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(record.status().as_u16(), 409);

    // 7. Abandon
    let deleted = client
        .delete(format!("{}/api/runs/{}", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let gone = client
        .get(format!("{}/api/runs/{}", address, id))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn runs_are_scoped_to_their_owner() {
    let dir = tempfile::tempdir().unwrap();
    let address = spawn_app(dir.path()).await;
    let client = reqwest::Client::new();
    let alice = token_for(&client, &address, "alice").await;
    let bob = token_for(&client, &address, "bobby").await;

    let run: serde_json::Value = client
        .post(format!("{}/api/runs", address))
        .header("Authorization", format!("Bearer {}", alice))
        .json(&serde_json::json!({ "activity": "star_watch", "demo": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(run["demo"], true);

    let peek = client
        .get(format!("{}/api/runs/{}", address, run["id"].as_str().unwrap()))
        .header("Authorization", format!("Bearer {}", bob))
        .send()
        .await
        .unwrap();
    assert_eq!(peek.status().as_u16(), 404);
}

#[tokio::test]
async fn unknown_activity_and_missing_token() {
    let dir = tempfile::tempdir().unwrap();
    let address = spawn_app(dir.path()).await;
    let client = reqwest::Client::new();

    let anonymous = client
        .post(format!("{}/api/runs", address))
        .json(&serde_json::json!({ "activity": "number_echo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let token = token_for(&client, &address, "casey").await;
    let unknown = client
        .post(format!("{}/api/runs", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "activity": "chess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);
}
