//! In-memory mirror of remote state plus the operator-visible event log.
//!
//! Both snapshot slices are only ever replaced wholesale, so a render is
//! always consistent with a single point-in-time snapshot and never mixes
//! rows from two polls.

use std::collections::VecDeque;
use std::sync::Arc;

use console_proto::{Channel, ConnectionStatus};
use parking_lot::Mutex;
use time::OffsetDateTime;

pub type SharedStore = Arc<Mutex<SnapshotStore>>;
pub type SharedLog = Arc<Mutex<LogBuffer>>;

/// Latest known backend state. Owned by the router and the poller, read by
/// the render pipeline.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    status: ConnectionStatus,
    channels: Vec<Channel>,
}

impl SnapshotStore {
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn replace_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn replace_channels(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
    }

    /// Applies the initial-state push frame. A missing channel collection is
    /// treated as empty, not as "keep the old rows".
    pub fn apply_initial(&mut self, status: ConnectionStatus, channels: Option<Vec<Channel>>) {
        self.status = status;
        self.channels = channels.unwrap_or_default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    /// Controller-to-MES protocol traffic.
    Receive,
    /// MES-to-controller protocol traffic.
    Send,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: OffsetDateTime,
    pub source: String,
    pub message: String,
    pub severity: Severity,
}

/// Bounded append-only event log. Overflow evicts the oldest entries so the
/// population never settles above the cap.
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    cap: usize,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(1024)),
            cap,
        }
    }

    pub fn push(&mut self, source: impl Into<String>, message: impl Into<String>, severity: Severity) {
        self.entries.push_back(LogEntry {
            timestamp: OffsetDateTime::now_utc(),
            source: source.into(),
            message: message.into(),
            severity,
        });
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    /// Drops everything and leaves a single confirmation entry behind.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.push("system", "log cleared", Severity::Info);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which state classes the operator currently wants to see. Classes without
/// a toggle (paused, finish, default) are always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSet {
    pub running: bool,
    pub standby: bool,
    pub alarm: bool,
    pub offline: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            running: true,
            standby: true,
            alarm: true,
            offline: true,
        }
    }
}

/// Normalized classification of a free-form channel state string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Running,
    Standby,
    Paused,
    Alarm,
    Finish,
    Offline,
    Default,
}

impl StateClass {
    pub fn is_visible(self, filters: &FilterSet) -> bool {
        match self {
            StateClass::Running => filters.running,
            StateClass::Standby => filters.standby,
            StateClass::Alarm => filters.alarm,
            StateClass::Offline => filters.offline,
            StateClass::Paused | StateClass::Finish | StateClass::Default => true,
        }
    }
}

/// Lowercase substring classification. The priority order is fixed and the
/// first match wins, which keeps ambiguous states deterministic.
pub fn classify(state: &str) -> StateClass {
    let s = state.to_lowercase();
    if s.contains("running") {
        StateClass::Running
    } else if s.contains("standby") {
        StateClass::Standby
    } else if s.contains("paused") {
        StateClass::Paused
    } else if s.contains("alarm") {
        StateClass::Alarm
    } else if s.contains("finish") {
        StateClass::Finish
    } else if s.contains("offline") {
        StateClass::Offline
    } else {
        StateClass::Default
    }
}
