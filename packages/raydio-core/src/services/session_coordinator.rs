//! Session state machine.
//!
//! Responsibilities:
//! - Own the catalog and its flattened view
//! - Drive the SDK connection lifecycle from network and SDK events
//! - Enforce single-active-stream toggling
//! - Relay now-playing metadata and install remote play/pause handlers
//! - Publish a [`SessionSnapshot`] after every state change
//!
//! [`SessionCoordinator`] is synchronous and owned by exactly one task
//! (see [`super::session_runtime`]). All inputs arrive as [`SessionInput`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::catalog::{owning_group_title, Catalog, Stream, StreamGroup};
use crate::error::ErrorCode;
use crate::events::{CatalogEvent, EventEmitter, NetworkEvent, PlaybackEvent, SessionEvent};
use crate::media::{AudioOutput, NowPlayingInfo, NowPlayingSurface, RemoteCommand};
use crate::sdk::{ListenState, SdkConnectionState, StreamingSdk};
use crate::utils::now_millis;

/// Collaborators the coordinator drives.
#[derive(Clone)]
pub struct SessionDependencies {
    pub sdk: Arc<dyn StreamingSdk>,
    pub audio_output: Arc<dyn AudioOutput>,
    pub now_playing: Arc<dyn NowPlayingSurface>,
}

/// Everything that can change session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// The presentation view became active.
    Appear,
    /// The app moved to the background.
    Background,
    /// The app returned to the foreground.
    Foreground,
    /// The user pressed a stream row.
    StreamPressed(String),
    ConnectionState(SdkConnectionState),
    ListenState(ListenState),
    NewGroup(StreamGroup),
    GroupUpdated(StreamGroup),
    GroupRemoved(StreamGroup),
    GroupsReceived(Vec<StreamGroup>),
    NetworkAvailability(bool),
}

/// Presentation-facing state, replaced wholesale on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub streams: Arc<[Stream]>,
    pub active_stream_id: Option<String>,
    pub network_available: bool,
    pub connection_state: SdkConnectionState,
    pub catalog_version: u64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            streams: Arc::from(Vec::new()),
            active_stream_id: None,
            network_available: false,
            connection_state: SdkConnectionState::Disconnected,
            catalog_version: 0,
        }
    }
}

/// Orchestrates the SDK from network, lifecycle and SDK events.
pub struct SessionCoordinator {
    deps: SessionDependencies,
    emitter: Arc<dyn EventEmitter>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    placeholder_title: String,
    catalog: Catalog,
    active_stream_id: Option<String>,
    network_available: bool,
    connection_state: SdkConnectionState,
    /// Set when the SDK disconnected while the network was unavailable.
    pending_reconnect: bool,
    remote_handlers_installed: bool,
}

impl SessionCoordinator {
    /// Creates a coordinator with an empty catalog.
    ///
    /// `network_available` seeds the availability flag, normally from
    /// [`crate::network::NetworkAvailabilityMonitor::current_availability`].
    pub fn new(
        deps: SessionDependencies,
        emitter: Arc<dyn EventEmitter>,
        placeholder_title: impl Into<String>,
        network_available: bool,
    ) -> Self {
        let connection_state = deps.sdk.connection_state();
        let snapshot = SessionSnapshot {
            network_available,
            connection_state,
            ..SessionSnapshot::default()
        };
        let (snapshot_tx, _) = watch::channel(snapshot);

        Self {
            deps,
            emitter,
            snapshot_tx,
            placeholder_title: placeholder_title.into(),
            catalog: Catalog::new(),
            active_stream_id: None,
            network_available,
            connection_state,
            pending_reconnect: false,
            remote_handlers_installed: false,
        }
    }

    /// Returns a receiver for snapshot updates.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn streams(&self) -> Arc<[Stream]> {
        self.catalog.streams()
    }

    pub fn active_stream_id(&self) -> Option<&str> {
        self.active_stream_id.as_deref()
    }

    pub fn network_available(&self) -> bool {
        self.network_available
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.pending_reconnect
    }

    /// Applies one input.
    pub fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Appear => self.on_appear(),
            SessionInput::Background => {
                log::info!("[SessionCoordinator] Entered background");
                self.deps.sdk.on_background_entered();
            }
            SessionInput::Foreground => {
                log::info!("[SessionCoordinator] Entered foreground");
                self.deps.sdk.on_foreground_entered();
            }
            SessionInput::StreamPressed(stream_id) => self.on_stream_pressed(&stream_id),
            SessionInput::ConnectionState(state) => self.on_connection_state(state),
            SessionInput::ListenState(state) => self.on_listen_state(state),
            SessionInput::NewGroup(group) => {
                let changed = self.catalog.add_group(group);
                self.after_catalog_mutation(changed);
            }
            SessionInput::GroupUpdated(group) => {
                let changed = self.catalog.update_group(group);
                self.after_catalog_mutation(changed);
            }
            SessionInput::GroupRemoved(group) => {
                let changed = self.catalog.remove_group(&group.title);
                self.after_catalog_mutation(changed);
            }
            SessionInput::GroupsReceived(groups) => {
                self.catalog.replace_all(groups);
                self.after_catalog_mutation(true);
            }
            SessionInput::NetworkAvailability(available) => self.on_network_availability(available),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    fn on_appear(&self) {
        if self.deps.sdk.connection_state() == SdkConnectionState::Connected {
            log::debug!("[SessionCoordinator] View appeared while connected, requesting streams");
            self.deps.sdk.request_streams();
        }
    }

    fn on_connection_state(&mut self, state: SdkConnectionState) {
        log::info!("[SessionCoordinator] SDK connection state: {:?}", state);
        self.connection_state = state;
        self.emitter.emit_session(SessionEvent::ConnectionStateChanged {
            state,
            timestamp: now_millis(),
        });
        self.publish_snapshot();

        match state {
            SdkConnectionState::Connected => {
                self.pending_reconnect = false;
                self.deps.sdk.request_streams();
            }
            SdkConnectionState::Disconnected if self.network_available => {
                self.request_reconnect();
            }
            SdkConnectionState::Disconnected => {
                log::info!("[SessionCoordinator] Disconnected while offline, reconnect deferred");
                self.pending_reconnect = true;
            }
            SdkConnectionState::Connecting => {}
        }
    }

    fn on_network_availability(&mut self, available: bool) {
        self.network_available = available;
        self.emitter.emit_network(NetworkEvent::AvailabilityChanged {
            available,
            timestamp: now_millis(),
        });
        self.publish_snapshot();

        if !available {
            self.deps.sdk.on_connection_lost();
            return;
        }

        self.deps.sdk.on_connection_reestablished();
        if std::mem::take(&mut self.pending_reconnect)
            && self.deps.sdk.connection_state() == SdkConnectionState::Disconnected
        {
            self.request_reconnect();
        }
    }

    fn request_reconnect(&self) {
        log::info!("[SessionCoordinator] Requesting SDK reconnect");
        self.deps.sdk.reconnect();
        self.emitter.emit_session(SessionEvent::ReconnectRequested {
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────────────────

    /// Toggles playback for `stream_id`.
    ///
    /// Any press while a stream is active pauses it and then clears it, so the
    /// "nothing active" state is published even when switching streams.
    fn on_stream_pressed(&mut self, stream_id: &str) {
        if let Err(e) = self.deps.audio_output.activate() {
            log::warn!(
                "[SessionCoordinator] Audio output activation failed: {} ({})",
                e,
                e.code()
            );
        }

        if let Some(previous) = self.active_stream_id.clone() {
            self.deps.sdk.pause();
            self.active_stream_id = None;
            self.publish_snapshot();
            if previous == stream_id {
                log::info!("[SessionCoordinator] Toggled off {}", stream_id);
                return;
            }
        }

        log::info!("[SessionCoordinator] Playing {}", stream_id);
        self.active_stream_id = Some(stream_id.to_string());
        self.publish_snapshot();
        self.deps.sdk.play(stream_id);
    }

    fn on_listen_state(&mut self, state: ListenState) {
        if !state.is_playing() {
            log::debug!("[SessionCoordinator] Listen state {:?}, clearing active", state);
            self.active_stream_id = None;
            self.emitter.emit_playback(PlaybackEvent::Stopped {
                timestamp: now_millis(),
            });
            self.publish_snapshot();
            return;
        }

        let active = self.deps.sdk.active_stream();
        let groups = self.deps.sdk.groups();
        let title = active
            .as_deref()
            .and_then(|id| owning_group_title(&groups, id))
            .unwrap_or(&self.placeholder_title)
            .to_string();

        self.deps.now_playing.publish(NowPlayingInfo::live(title.clone()));
        self.install_remote_handlers();

        self.active_stream_id = active.clone();
        self.emitter.emit_playback(PlaybackEvent::Started {
            stream_id: active,
            title,
            timestamp: now_millis(),
        });
        self.publish_snapshot();
    }

    fn install_remote_handlers(&mut self) {
        if self.remote_handlers_installed {
            return;
        }

        let sdk = Arc::clone(&self.deps.sdk);
        self.deps.now_playing.set_handler(
            RemoteCommand::Pause,
            Arc::new(move || sdk.pause()),
        );

        let sdk = Arc::clone(&self.deps.sdk);
        self.deps.now_playing.set_handler(
            RemoteCommand::Play,
            Arc::new(move || {
                if let Some(stream_id) = sdk.active_stream() {
                    sdk.play(&stream_id);
                }
            }),
        );

        self.deps.now_playing.set_enabled(RemoteCommand::Play, true);
        self.deps.now_playing.set_enabled(RemoteCommand::Pause, true);
        for command in RemoteCommand::NOT_APPLICABLE_TO_LIVE {
            self.deps.now_playing.set_enabled(command, false);
        }

        self.remote_handlers_installed = true;
        log::debug!("[SessionCoordinator] Remote play/pause handlers installed");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publication
    // ─────────────────────────────────────────────────────────────────────────

    fn after_catalog_mutation(&mut self, changed: bool) {
        if !changed {
            return;
        }
        log::debug!(
            "[SessionCoordinator] Catalog v{}: {} group(s), {} stream(s)",
            self.catalog.version(),
            self.catalog.groups().len(),
            self.catalog.streams().len()
        );
        self.emitter.emit_catalog(CatalogEvent::Updated {
            version: self.catalog.version(),
            group_count: self.catalog.groups().len(),
            stream_count: self.catalog.streams().len(),
            timestamp: now_millis(),
        });
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            streams: self.catalog.streams(),
            active_stream_id: self.active_stream_id.clone(),
            network_available: self.network_available,
            connection_state: self.connection_state,
            catalog_version: self.catalog.version(),
        });
    }
}
