//! Platform media integration: the audio output path and the OS "now playing"
//! surface with its remote commands.
//!
//! Both are write-mostly sinks from the coordinator's point of view. The
//! headless defaults here keep everything in memory so the HTTP layer can show
//! the published metadata and trigger remote commands.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

// ─────────────────────────────────────────────────────────────────────────────
// Audio Output
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from configuring the audio output path.
#[derive(Debug, Error)]
pub enum AudioOutputError {
    #[error("Failed to activate audio output: {0}")]
    Activation(String),
}

impl ErrorCode for AudioOutputError {
    fn code(&self) -> &'static str {
        match self {
            Self::Activation(_) => "audio_activation_failed",
        }
    }
}

/// Audio output path that must be configured before playback starts.
pub trait AudioOutput: Send + Sync {
    /// Configures the output for playback and activates it.
    fn activate(&self) -> Result<(), AudioOutputError>;
}

/// Audio output for hosts without an output session to configure.
pub struct NoopAudioOutput;

impl AudioOutput for NoopAudioOutput {
    fn activate(&self) -> Result<(), AudioOutputError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Now Playing
// ─────────────────────────────────────────────────────────────────────────────

/// Metadata shown by the OS for the current media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingInfo {
    pub title: String,
    pub is_live_stream: bool,
}

impl NowPlayingInfo {
    /// Metadata for a live stream with the given title.
    pub fn live(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            is_live_stream: true,
        }
    }
}

/// Remote-control commands the OS media surface can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteCommand {
    Play,
    Pause,
    SeekForward,
    SeekBackward,
    NextTrack,
    PreviousTrack,
}

impl RemoteCommand {
    /// Commands with no meaning for a live stream.
    pub const NOT_APPLICABLE_TO_LIVE: [RemoteCommand; 4] = [
        RemoteCommand::SeekForward,
        RemoteCommand::SeekBackward,
        RemoteCommand::NextTrack,
        RemoteCommand::PreviousTrack,
    ];

    /// Parses the path segment form used by the HTTP API (`play`, `seekForward`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
    }
}

/// Callback invoked when a remote command fires.
pub type RemoteCommandHandler = Arc<dyn Fn() + Send + Sync>;

/// OS-level now-playing display and remote-control integration.
pub trait NowPlayingSurface: Send + Sync {
    /// Publishes metadata for the current media item.
    fn publish(&self, info: NowPlayingInfo);

    /// Installs the handler for `command`, replacing any previous one.
    fn set_handler(&self, command: RemoteCommand, handler: RemoteCommandHandler);

    /// Enables or disables `command` on the surface.
    fn set_enabled(&self, command: RemoteCommand, enabled: bool);
}

#[derive(Default)]
struct SurfaceState {
    info: Option<NowPlayingInfo>,
    handlers: HashMap<RemoteCommand, RemoteCommandHandler>,
    disabled: Vec<RemoteCommand>,
}

/// In-memory now-playing surface.
///
/// Remote commands are triggered with [`dispatch`](Self::dispatch). A command
/// is enabled by default and only fires if a handler is installed.
#[derive(Default)]
pub struct InMemoryNowPlayingSurface {
    state: RwLock<SurfaceState>,
}

impl InMemoryNowPlayingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published metadata.
    pub fn now_playing(&self) -> Option<NowPlayingInfo> {
        self.state.read().info.clone()
    }

    pub fn is_enabled(&self, command: RemoteCommand) -> bool {
        !self.state.read().disabled.contains(&command)
    }

    pub fn has_handler(&self, command: RemoteCommand) -> bool {
        self.state.read().handlers.contains_key(&command)
    }

    /// Invokes the handler for `command`.
    ///
    /// Returns `false` if the command is disabled or has no handler.
    pub fn dispatch(&self, command: RemoteCommand) -> bool {
        let handler = {
            let state = self.state.read();
            if state.disabled.contains(&command) {
                log::debug!("[NowPlaying] Ignoring disabled command {:?}", command);
                return false;
            }
            state.handlers.get(&command).cloned()
        };
        match handler {
            Some(handler) => {
                log::info!("[NowPlaying] Remote command {:?}", command);
                handler();
                true
            }
            None => false,
        }
    }
}

impl NowPlayingSurface for InMemoryNowPlayingSurface {
    fn publish(&self, info: NowPlayingInfo) {
        log::info!("[NowPlaying] {} (live: {})", info.title, info.is_live_stream);
        self.state.write().info = Some(info);
    }

    fn set_handler(&self, command: RemoteCommand, handler: RemoteCommandHandler) {
        self.state.write().handlers.insert(command, handler);
    }

    fn set_enabled(&self, command: RemoteCommand, enabled: bool) {
        let mut state = self.state.write();
        state.disabled.retain(|c| *c != command);
        if !enabled {
            state.disabled.push(command);
        }
    }
}
