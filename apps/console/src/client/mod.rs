//! The synchronization core: push-channel session, frame routing, polling
//! backstop, and command issuance against the MES backend.

pub mod commands;
pub mod live;
pub mod poller;
pub mod router;

use std::sync::Arc;
use tokio::sync::Notify;

/// Wakes the render loop after a snapshot or log change.
pub type Redraw = Arc<Notify>;
