//! Wire types for the MES backend's HTTP and WebSocket surfaces.
//!
//! Field names are pinned to what the backend actually emits: channel
//! records use the Go-style PascalCase keys, status records use snake_case.

use serde::{Deserialize, Serialize};

/// Marker value of the `type` field on the snapshot frame a freshly opened
/// push channel receives.
pub const INITIAL_STATE: &str = "initial_state";

/// Direction tag on protocol events relayed from the controller to the MES.
/// Any other direction value means MES-to-controller traffic.
pub const DIRECTION_FROM_CONTROLLER: &str = "TPT->MES";

/// Number of channels the controller exposes.
pub const CHANNEL_COUNT: u32 = 128;

/// Channel state strings used by the line protocol. The console classifies
/// by substring, so these are mostly useful for tests and fixtures.
pub mod state {
    pub const STANDBY: &str = "StandBy";
    pub const RUNNING: &str = "Running";
    pub const PAUSED: &str = "Paused";
    pub const START_FAILED: &str = "StartFailed";
    pub const CHANGE_STEP_FAILED: &str = "ChangeStepFailed";
    pub const RESUME_FAILED: &str = "ResumeFailed";
    pub const ALARM: &str = "Alarm";
    pub const NO_LOAD: &str = "NoLoad";
    pub const FINISH: &str = "Finish";
    pub const REVERSE_POLARITY: &str = "ReversePolarity";
    pub const OFFLINE: &str = "OffLine";
}

/// Zero-padded channel identifier, e.g. `channel_id(5)` -> `"CH005"`.
pub fn channel_id(index: u32) -> String {
    format!("CH{index:03}")
}

/// Link-health snapshot returned by `GET /api/status` and embedded in the
/// initial-state push frame. The push variant omits `tcp_connected`, so it
/// defaults to false until the first poll fills it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    #[serde(default)]
    pub tcp_connected: bool,
    #[serde(default)]
    pub tpt_connected: bool,
    #[serde(default)]
    pub tpt_state: Option<String>,
    #[serde(default)]
    pub work_station_name: Option<String>,
    #[serde(default)]
    pub channel_count: Option<u32>,
}

/// One channel row from `GET /api/channels`. The backend serializes its Go
/// struct without json tags, hence the PascalCase keys. Empty strings mean
/// "not set" (Go zero values) and render as a dash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "ChannelID")]
    pub channel_id: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Barcode", default)]
    pub barcode: String,
    #[serde(rename = "Process", default)]
    pub process: String,
    #[serde(rename = "DataPath", default)]
    pub data_path: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// Loose envelope for inbound push frames. Classification happens in the
/// router: an `initial_state` type tag wins, then a `direction` tag marks a
/// protocol event, and anything else carries no actionable information.
#[derive(Debug, Clone, Deserialize)]
pub struct PushFrame {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<ConnectionStatus>,
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Body of `POST /api/cmd/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub channel: String,
    pub barcode: String,
    pub process: String,
    pub data_path: String,
}

/// Body of the channel-targeted commands (stop, pause, resume).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub channel: String,
}

/// Body of `POST /api/cmd/user_command`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Error body the backend returns alongside non-2xx command responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
