//! Classifies inbound push-channel payloads and dispatches them: initial
//! state replaces the store, protocol events feed the operator log and may
//! schedule a deferred snapshot refresh, everything else is noise.

use std::time::Duration;

use console_proto::{PushFrame, DIRECTION_FROM_CONTROLLER, INITIAL_STATE};
use tokio::sync::mpsc;
use tracing::debug;

use super::Redraw;
use crate::state::{Severity, SharedLog, SharedStore};

/// How a payload was classified and what it caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    InitialState,
    Event { refresh_scheduled: bool },
    Ignored,
    Invalid,
}

/// One-shot deferred refresh trigger feeding the poller. Overlapping
/// schedules are not coalesced: every qualifying event fires its own timer,
/// so a refresh happens at least once per event. Redundant refreshes are
/// harmless since the fetch is a full replace.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<()>,
    delay: Duration,
}

impl RefreshHandle {
    pub fn new(tx: mpsc::UnboundedSender<()>, delay: Duration) -> Self {
        Self { tx, delay }
    }

    pub fn schedule(&self) {
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(());
        });
    }
}

pub struct MessageRouter {
    store: SharedStore,
    logs: SharedLog,
    refresh: RefreshHandle,
    redraw: Redraw,
}

impl MessageRouter {
    pub fn new(store: SharedStore, logs: SharedLog, refresh: RefreshHandle, redraw: Redraw) -> Self {
        Self {
            store,
            logs,
            refresh,
            redraw,
        }
    }

    pub fn route(&self, raw: &str) -> Routed {
        let frame: PushFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%err, "dropping unparseable push frame");
                return Routed::Invalid;
            }
        };

        if frame.kind.as_deref() == Some(INITIAL_STATE) {
            self.store
                .lock()
                .apply_initial(frame.status.unwrap_or_default(), frame.channels);
            self.redraw.notify_one();
            return Routed::InitialState;
        }

        if let Some(direction) = frame.direction {
            let severity = if direction == DIRECTION_FROM_CONTROLLER {
                Severity::Receive
            } else {
                Severity::Send
            };
            let data = frame.data.unwrap_or(serde_json::Value::Null);
            let body = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
            let msg_type = data
                .get("type")
                .and_then(|value| value.as_str())
                .unwrap_or("Unknown");
            // Case-sensitive on purpose: the protocol's type tags are upper
            // case and lowercase lookalikes are not status traffic.
            let refresh_scheduled = msg_type.contains("STATUS") || msg_type.contains("REPORT");
            self.logs.lock().push(direction, body, severity);
            self.redraw.notify_one();
            if refresh_scheduled {
                self.refresh.schedule();
            }
            return Routed::Event { refresh_scheduled };
        }

        Routed::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LogBuffer, SnapshotStore};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn router(delay: Duration) -> (MessageRouter, SharedStore, SharedLog, mpsc::UnboundedReceiver<()>) {
        let store: SharedStore = Arc::new(Mutex::new(SnapshotStore::default()));
        let logs: SharedLog = Arc::new(Mutex::new(LogBuffer::new(500)));
        let (tx, rx) = mpsc::unbounded_channel();
        let router = MessageRouter::new(
            store.clone(),
            logs.clone(),
            RefreshHandle::new(tx, delay),
            Arc::new(Notify::new()),
        );
        (router, store, logs, rx)
    }

    #[tokio::test]
    async fn initial_state_replaces_store() {
        let (router, store, logs, _rx) = router(Duration::from_millis(500));
        let raw = r#"{
            "type": "initial_state",
            "status": {"tpt_connected": true, "tpt_state": "Online-Auto", "work_station_name": "WS-01"},
            "channels": [{"ChannelID": "CH001", "State": "Running"}]
        }"#;
        assert_eq!(router.route(raw), Routed::InitialState);
        let store = store.lock();
        assert!(store.status().tpt_connected);
        assert_eq!(store.channels().len(), 1);
        assert!(logs.lock().is_empty());
    }

    #[tokio::test]
    async fn initial_state_without_channels_is_empty() {
        let (router, store, _logs, _rx) = router(Duration::from_millis(500));
        router.route(r#"{"type": "initial_state", "status": {"tpt_connected": false}}"#);
        assert!(store.lock().channels().is_empty());
    }

    #[tokio::test]
    async fn controller_event_logs_with_receive_severity() {
        let (router, _store, logs, _rx) = router(Duration::from_millis(500));
        let routed = router.route(
            r#"{"direction": "TPT->MES", "data": {"type": "LINK", "state": "Online-Auto"}}"#,
        );
        assert_eq!(
            routed,
            Routed::Event {
                refresh_scheduled: false
            }
        );
        let logs = logs.lock();
        let entry = logs.iter().next().unwrap();
        assert_eq!(entry.severity, Severity::Receive);
        assert_eq!(entry.source, "TPT->MES");
        assert!(entry.message.contains("Online-Auto"));
    }

    #[tokio::test]
    async fn mes_event_logs_with_send_severity() {
        let (router, _store, logs, _rx) = router(Duration::from_millis(500));
        router.route(r#"{"direction": "MES->TPT", "data": {"type": "START", "channel": "CH001"}}"#);
        assert_eq!(logs.lock().iter().next().unwrap().severity, Severity::Send);
    }

    #[tokio::test(start_paused = true)]
    async fn status_report_event_schedules_deferred_refresh() {
        let (router, _store, _logs, mut rx) = router(Duration::from_millis(500));
        let routed = router.route(
            r#"{"direction": "TPT->MES", "data": {"type": "CH001_STATUS_REPORT"}}"#,
        );
        assert_eq!(
            routed,
            Routed::Event {
                refresh_scheduled: true
            }
        );

        // Nothing fires before the 500 ms window elapses.
        tokio::time::advance(Duration::from_millis(499)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_events_each_fire_their_own_refresh() {
        let (router, _store, _logs, mut rx) = router(Duration::from_millis(500));
        router.route(r#"{"direction": "TPT->MES", "data": {"type": "STATUS"}}"#);
        router.route(r#"{"direction": "TPT->MES", "data": {"type": "REPORT"}}"#);
        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn lowercase_type_tags_do_not_refresh() {
        let (router, _store, _logs, _rx) = router(Duration::from_millis(500));
        let routed = router.route(r#"{"direction": "TPT->MES", "data": {"type": "status_report"}}"#);
        assert_eq!(
            routed,
            Routed::Event {
                refresh_scheduled: false
            }
        );
    }

    #[tokio::test]
    async fn unknown_shapes_are_ignored_silently() {
        let (router, store, logs, _rx) = router(Duration::from_millis(500));
        assert_eq!(router.route(r#"{"foo": 1}"#), Routed::Ignored);
        assert!(logs.lock().is_empty());
        assert!(store.lock().channels().is_empty());
    }

    #[tokio::test]
    async fn garbage_is_dropped_without_logging() {
        let (router, _store, logs, _rx) = router(Duration::from_millis(500));
        assert_eq!(router.route("not json"), Routed::Invalid);
        assert!(logs.lock().is_empty());
    }
}
