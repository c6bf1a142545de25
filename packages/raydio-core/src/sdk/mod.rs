//! Trait abstractions for the streaming SDK.
//!
//! The SDK owns the connection transport, playback and the authoritative
//! stream catalog. The coordinator only calls the operations below and
//! registers one handler per callback category.

mod diagnostics;
mod simulated;

pub use diagnostics::{DiagnosticLog, TracingLogSink};
pub use simulated::SimulatedSdk;

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::StreamGroup;

/// Connection state reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SdkConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Listening state reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListenState {
    #[default]
    Stopped,
    Buffering,
    Playing,
    Paused,
}

impl ListenState {
    pub fn is_playing(self) -> bool {
        self == ListenState::Playing
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────────────────────────

/// Connection lifecycle operations. All calls are fire-and-forget; retries are
/// the SDK's own concern.
pub trait SdkLifecycle: Send + Sync {
    fn connect(&self);
    fn reconnect(&self);
    fn on_connection_lost(&self);
    fn on_connection_reestablished(&self);
    fn on_background_entered(&self);
    fn on_foreground_entered(&self);
    /// Asks the SDK to deliver a fresh catalog through the group handler.
    fn request_streams(&self);
}

/// Playback control.
pub trait SdkPlayback: Send + Sync {
    fn play(&self, stream_id: &str);
    fn pause(&self);
}

/// Queries against SDK-owned state.
pub trait SdkStateQuery: Send + Sync {
    fn connection_state(&self) -> SdkConnectionState;
    /// Stream the SDK currently considers active, playing or paused.
    fn active_stream(&self) -> Option<String>;
    /// The SDK's current group snapshot.
    fn groups(&self) -> Vec<StreamGroup>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Callbacks
// ─────────────────────────────────────────────────────────────────────────────

/// Receives connection state changes.
pub trait ConnectionStateHandler: Send + Sync {
    fn on_connection_state_changed(&self, state: SdkConnectionState);
}

/// Receives listen state changes.
pub trait ListenStateHandler: Send + Sync {
    fn on_listen_state_changed(&self, state: ListenState);
}

/// Receives catalog changes.
pub trait StreamGroupHandler: Send + Sync {
    fn on_new_group(&self, group: StreamGroup);
    fn on_group_updated(&self, group: StreamGroup);
    fn on_group_removed(&self, group: StreamGroup);
    /// Full catalog replacement.
    fn on_groups_received(&self, groups: Vec<StreamGroup>);
}

/// Receives the SDK's diagnostic log records.
pub trait DiagnosticLogHandler: Send + Sync {
    fn on_information_log(&self, log: DiagnosticLog);
    fn on_error_log(&self, log: DiagnosticLog);
    fn on_system_error_log(&self, log: DiagnosticLog);
    fn on_interaction_log(&self, log: DiagnosticLog);
}

/// Handler registration, one handler per category. Registering again
/// replaces the previous handler.
pub trait SdkCallbacks: Send + Sync {
    fn set_connection_handler(&self, handler: Arc<dyn ConnectionStateHandler>);
    fn set_listen_state_handler(&self, handler: Arc<dyn ListenStateHandler>);
    fn set_group_handler(&self, handler: Arc<dyn StreamGroupHandler>);
    fn set_log_handler(&self, handler: Arc<dyn DiagnosticLogHandler>);
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Traits (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for everything the session coordinator needs.
pub trait StreamingSdk: SdkLifecycle + SdkPlayback + SdkStateQuery + SdkCallbacks {}

/// Blanket implementation for any type implementing all traits.
impl<T: SdkLifecycle + SdkPlayback + SdkStateQuery + SdkCallbacks> StreamingSdk for T {}
