//! Polling backstop against a mock MES backend.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{mpsc, Notify};
use url::Url;

use tpt_console::client::poller::PollingScheduler;
use tpt_console::state::{SharedStore, SnapshotStore};

#[derive(Clone)]
struct Backend {
    channels: Arc<Mutex<serde_json::Value>>,
    status: Arc<Mutex<serde_json::Value>>,
}

impl Backend {
    fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(json!([
                {"ChannelID": "CH001", "State": "Running", "Barcode": "B1"},
                {"ChannelID": "CH002", "State": "StandBy"}
            ]))),
            status: Arc::new(Mutex::new(json!({
                "tcp_connected": true,
                "tpt_connected": false,
                "tpt_state": "Offline",
                "work_station_name": "WS-01",
                "channel_count": 128
            }))),
        }
    }
}

async fn get_channels(State(backend): State<Backend>) -> Json<serde_json::Value> {
    Json(backend.channels.lock().clone())
}

async fn get_status(State(backend): State<Backend>) -> Json<serde_json::Value> {
    Json(backend.status.lock().clone())
}

async fn serve(backend: Backend) -> Url {
    let app = Router::new()
        .route("/api/channels", get(get_channels))
        .route("/api/status", get(get_status))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}").parse().unwrap()
}

fn scheduler(base: &Url, store: SharedStore, interval: Duration) -> PollingScheduler {
    PollingScheduler::new(base, store, Arc::new(Notify::new()), interval)
}

async fn wait_until(mut probe: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !probe() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn refresh_replaces_both_store_slices() {
    let base = serve(Backend::new()).await;
    let store: SharedStore = Arc::new(Mutex::new(SnapshotStore::default()));
    let poller = scheduler(&base, store.clone(), Duration::from_secs(3600));

    poller.refresh().await;

    let store = store.lock();
    assert_eq!(store.channels().len(), 2);
    assert_eq!(store.channels()[0].channel_id, "CH001");
    assert_eq!(store.channels()[0].barcode, "B1");
    assert!(store.status().tcp_connected);
    assert!(!store.status().tpt_connected);
    assert_eq!(store.status().work_station_name.as_deref(), Some("WS-01"));
}

#[tokio::test]
async fn interval_loop_seeds_the_store_at_startup() {
    let base = serve(Backend::new()).await;
    let store: SharedStore = Arc::new(Mutex::new(SnapshotStore::default()));
    let poller = scheduler(&base, store.clone(), Duration::from_millis(50));

    let (_tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(poller.run(rx));

    wait_until(|| !store.lock().channels().is_empty()).await;
}

#[tokio::test]
async fn trigger_channel_reuses_the_same_refresh_path() {
    let backend = Backend::new();
    let base = serve(backend.clone()).await;
    let store: SharedStore = Arc::new(Mutex::new(SnapshotStore::default()));
    let poller = scheduler(&base, store.clone(), Duration::from_secs(3600));

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(poller.run(rx));
    // First tick of the hour-long interval fires immediately and seeds.
    wait_until(|| !store.lock().channels().is_empty()).await;

    *backend.channels.lock() = json!([
        {"ChannelID": "CH001", "State": "Alarm"}
    ]);
    tx.send(()).unwrap();

    wait_until(|| {
        let store = store.lock();
        store.channels().len() == 1 && store.channels()[0].state == "Alarm"
    })
    .await;
}

#[tokio::test]
async fn failed_fetch_leaves_previous_snapshot_in_place() {
    let base = serve(Backend::new()).await;
    let store: SharedStore = Arc::new(Mutex::new(SnapshotStore::default()));
    let poller = scheduler(&base, store.clone(), Duration::from_secs(3600));
    poller.refresh().await;
    assert_eq!(store.lock().channels().len(), 2);

    // Unroutable backend: both fetches fail, nothing is replaced.
    let dead: Url = "http://127.0.0.1:9/".parse().unwrap();
    let broken = scheduler(&dead, store.clone(), Duration::from_secs(3600));
    broken.refresh().await;

    let store = store.lock();
    assert_eq!(store.channels().len(), 2);
    assert!(store.status().tcp_connected);
}
