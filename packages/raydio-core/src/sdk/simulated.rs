//! In-process SDK used by the headless server and by tests.
//!
//! Connections always succeed, the catalog is the one the SDK was started
//! with, and playback is a state flag. Callbacks are invoked synchronously on
//! the calling thread, after internal locks are released.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{
    ConnectionStateHandler, DiagnosticLog, DiagnosticLogHandler, ListenState, ListenStateHandler,
    SdkCallbacks, SdkConnectionState, SdkLifecycle, SdkPlayback, SdkStateQuery,
    StreamGroupHandler,
};
use crate::catalog::StreamGroup;

#[derive(Debug, Default)]
struct SessionState {
    connection: SdkConnectionState,
    listen: ListenState,
    active_stream: Option<String>,
    in_background: bool,
}

#[derive(Default)]
struct Handlers {
    connection: Option<Arc<dyn ConnectionStateHandler>>,
    listen: Option<Arc<dyn ListenStateHandler>>,
    groups: Option<Arc<dyn StreamGroupHandler>>,
    log: Option<Arc<dyn DiagnosticLogHandler>>,
}

/// Simulated streaming SDK.
pub struct SimulatedSdk {
    partner_id: u32,
    catalog: RwLock<Vec<StreamGroup>>,
    state: Mutex<SessionState>,
    handlers: RwLock<Handlers>,
}

impl SimulatedSdk {
    /// Starts an SDK instance for `partner_id` serving `catalog`.
    pub fn start(partner_id: u32, catalog: Vec<StreamGroup>) -> Self {
        log::info!(
            "[SimulatedSdk] Started for partner {} with {} group(s)",
            partner_id,
            catalog.len()
        );
        Self {
            partner_id,
            catalog: RwLock::new(catalog),
            state: Mutex::new(SessionState::default()),
            handlers: RwLock::new(Handlers::default()),
        }
    }

    pub fn partner_id(&self) -> u32 {
        self.partner_id
    }

    pub fn listen_state(&self) -> ListenState {
        self.state.lock().listen
    }

    pub fn is_in_background(&self) -> bool {
        self.state.lock().in_background
    }

    /// Simulates the transport dropping without any lifecycle call.
    pub fn drop_connection(&self) {
        self.log_system_error("Transport dropped");
        self.set_disconnected();
    }

    /// Adds a group to the catalog and announces it.
    pub fn publish_new_group(&self, group: StreamGroup) {
        self.catalog.write().push(group.clone());
        if let Some(handler) = self.group_handler() {
            handler.on_new_group(group);
        }
    }

    /// Replaces a group (matched by title) and announces the update.
    pub fn publish_group_update(&self, group: StreamGroup) {
        {
            let mut catalog = self.catalog.write();
            if let Some(existing) = catalog.iter_mut().find(|g| g.title == group.title) {
                *existing = group.clone();
            }
        }
        if let Some(handler) = self.group_handler() {
            handler.on_group_updated(group);
        }
    }

    /// Removes a group by title and announces the removal.
    pub fn publish_group_removal(&self, title: &str) {
        let removed = {
            let mut catalog = self.catalog.write();
            let index = catalog.iter().position(|g| g.title == title);
            index.map(|index| catalog.remove(index))
        };
        if let (Some(group), Some(handler)) = (removed, self.group_handler()) {
            handler.on_group_removed(group);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn group_handler(&self) -> Option<Arc<dyn StreamGroupHandler>> {
        self.handlers.read().groups.clone()
    }

    fn set_connection(&self, connection: SdkConnectionState) {
        self.state.lock().connection = connection;
        let handler = self.handlers.read().connection.clone();
        if let Some(handler) = handler {
            handler.on_connection_state_changed(connection);
        }
    }

    fn set_listen(&self, listen: ListenState, active_stream: Option<Option<String>>) {
        {
            let mut state = self.state.lock();
            state.listen = listen;
            if let Some(active_stream) = active_stream {
                state.active_stream = active_stream;
            }
        }
        let handler = self.handlers.read().listen.clone();
        if let Some(handler) = handler {
            handler.on_listen_state_changed(listen);
        }
    }

    fn set_disconnected(&self) {
        let was_playing = {
            let state = self.state.lock();
            if state.connection == SdkConnectionState::Disconnected {
                return;
            }
            state.listen.is_playing()
        };
        self.set_connection(SdkConnectionState::Disconnected);
        if was_playing {
            self.set_listen(ListenState::Stopped, None);
        }
    }

    fn establish(&self) {
        if self.state.lock().connection == SdkConnectionState::Connected {
            self.log_interaction("Already connected");
            return;
        }
        self.set_connection(SdkConnectionState::Connecting);
        self.set_connection(SdkConnectionState::Connected);
        self.log_info(format!("Connected (partner {})", self.partner_id));
    }

    fn log_handler(&self) -> Option<Arc<dyn DiagnosticLogHandler>> {
        self.handlers.read().log.clone()
    }

    fn log_info(&self, message: impl Into<String>) {
        if let Some(handler) = self.log_handler() {
            handler.on_information_log(DiagnosticLog::new(message));
        }
    }

    fn log_error(&self, message: impl Into<String>) {
        if let Some(handler) = self.log_handler() {
            handler.on_error_log(DiagnosticLog::new(message));
        }
    }

    fn log_system_error(&self, message: impl Into<String>) {
        if let Some(handler) = self.log_handler() {
            handler.on_system_error_log(DiagnosticLog::new(message));
        }
    }

    fn log_interaction(&self, message: impl Into<String>) {
        if let Some(handler) = self.log_handler() {
            handler.on_interaction_log(DiagnosticLog::new(message));
        }
    }
}

impl SdkLifecycle for SimulatedSdk {
    fn connect(&self) {
        self.log_interaction("connect");
        self.establish();
    }

    fn reconnect(&self) {
        self.log_interaction("reconnect");
        self.establish();
    }

    fn on_connection_lost(&self) {
        self.log_interaction("connection lost");
        self.set_disconnected();
    }

    fn on_connection_reestablished(&self) {
        self.log_interaction("connection reestablished");
        if self.state.lock().connection == SdkConnectionState::Disconnected {
            self.establish();
        }
    }

    fn on_background_entered(&self) {
        self.state.lock().in_background = true;
        self.log_interaction("entered background");
    }

    fn on_foreground_entered(&self) {
        self.state.lock().in_background = false;
        self.log_interaction("entered foreground");
    }

    fn request_streams(&self) {
        if self.state.lock().connection != SdkConnectionState::Connected {
            self.log_error("Streams requested while not connected");
            return;
        }
        let groups = self.catalog.read().clone();
        if let Some(handler) = self.group_handler() {
            handler.on_groups_received(groups);
        }
    }
}

impl SdkPlayback for SimulatedSdk {
    fn play(&self, stream_id: &str) {
        self.log_interaction(format!("play {}", stream_id));
        if self.state.lock().connection != SdkConnectionState::Connected {
            self.log_error(format!("Cannot play {}: not connected", stream_id));
            return;
        }
        let known = self
            .catalog
            .read()
            .iter()
            .any(|g| g.contains_stream(stream_id));
        if !known {
            self.log_error(format!("Cannot play {}: unknown stream", stream_id));
            return;
        }
        self.set_listen(ListenState::Playing, Some(Some(stream_id.to_string())));
    }

    fn pause(&self) {
        self.log_interaction("pause");
        if self.state.lock().listen.is_playing() {
            self.set_listen(ListenState::Paused, None);
        }
    }
}

impl SdkStateQuery for SimulatedSdk {
    fn connection_state(&self) -> SdkConnectionState {
        self.state.lock().connection
    }

    fn active_stream(&self) -> Option<String> {
        self.state.lock().active_stream.clone()
    }

    fn groups(&self) -> Vec<StreamGroup> {
        self.catalog.read().clone()
    }
}

impl SdkCallbacks for SimulatedSdk {
    fn set_connection_handler(&self, handler: Arc<dyn ConnectionStateHandler>) {
        self.handlers.write().connection = Some(handler);
    }

    fn set_listen_state_handler(&self, handler: Arc<dyn ListenStateHandler>) {
        self.handlers.write().listen = Some(handler);
    }

    fn set_group_handler(&self, handler: Arc<dyn StreamGroupHandler>) {
        self.handlers.write().groups = Some(handler);
    }

    fn set_log_handler(&self, handler: Arc<dyn DiagnosticLogHandler>) {
        self.handlers.write().log = Some(handler);
    }
}
