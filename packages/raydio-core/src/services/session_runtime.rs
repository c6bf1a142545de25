//! Task that owns the [`SessionCoordinator`] and the handle used to drive it.
//!
//! SDK callbacks and presentation commands are queued on one unbounded
//! channel so SDK threads never block. Availability changes come straight
//! from the monitor's broadcast channel.

use std::sync::Arc;

use async_stream::stream;
use futures::stream::Stream as FuturesStream;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::session_coordinator::{
    SessionCoordinator, SessionDependencies, SessionInput, SessionSnapshot,
};
use crate::catalog::{Stream, StreamGroup};
use crate::error::{RaydioError, RaydioResult};
use crate::events::EventEmitter;
use crate::network::NetworkAvailabilityMonitor;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::sdk::{
    ConnectionStateHandler, ListenState, ListenStateHandler, SdkConnectionState,
    StreamGroupHandler, TracingLogSink,
};

// ─────────────────────────────────────────────────────────────────────────────
// SDK callback forwarding
// ─────────────────────────────────────────────────────────────────────────────

/// Turns SDK callbacks into [`SessionInput`]s on the coordinator's queue.
struct SdkEventForwarder {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SdkEventForwarder {
    fn forward(&self, input: SessionInput) {
        if self.tx.send(input).is_err() {
            log::debug!("[SessionRuntime] Dropping SDK callback, session closed");
        }
    }
}

impl ConnectionStateHandler for SdkEventForwarder {
    fn on_connection_state_changed(&self, state: SdkConnectionState) {
        self.forward(SessionInput::ConnectionState(state));
    }
}

impl ListenStateHandler for SdkEventForwarder {
    fn on_listen_state_changed(&self, state: ListenState) {
        self.forward(SessionInput::ListenState(state));
    }
}

impl StreamGroupHandler for SdkEventForwarder {
    fn on_new_group(&self, group: StreamGroup) {
        self.forward(SessionInput::NewGroup(group));
    }

    fn on_group_updated(&self, group: StreamGroup) {
        self.forward(SessionInput::GroupUpdated(group));
    }

    fn on_group_removed(&self, group: StreamGroup) {
        self.forward(SessionInput::GroupRemoved(group));
    }

    fn on_groups_received(&self, groups: Vec<StreamGroup>) {
        self.forward(SessionInput::GroupsReceived(groups));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Presentation-facing handle to a running session.
///
/// Cheap to clone. Commands are queued and applied in order by the session
/// task; state is read from the latest published [`SessionSnapshot`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionInput>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    cancel_token: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    fn send(&self, input: SessionInput) -> RaydioResult<()> {
        self.tx.send(input).map_err(|_| RaydioError::SessionClosed)
    }

    pub fn on_appear(&self) -> RaydioResult<()> {
        self.send(SessionInput::Appear)
    }

    pub fn on_went_to_background(&self) -> RaydioResult<()> {
        self.send(SessionInput::Background)
    }

    pub fn on_went_to_foreground(&self) -> RaydioResult<()> {
        self.send(SessionInput::Foreground)
    }

    pub fn on_stream_pressed(&self, stream_id: impl Into<String>) -> RaydioResult<()> {
        self.send(SessionInput::StreamPressed(stream_id.into()))
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn streams(&self) -> Arc<[Stream]> {
        Arc::clone(&self.snapshot_rx.borrow().streams)
    }

    pub fn active_stream_id(&self) -> Option<String> {
        self.snapshot_rx.borrow().active_stream_id.clone()
    }

    /// Receiver that observes every published snapshot from now on.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stream of snapshots, starting with the current one.
    ///
    /// Intermediate snapshots published faster than the consumer polls are
    /// coalesced.
    pub fn snapshots(&self) -> impl FuturesStream<Item = SessionSnapshot> + Send + 'static {
        let mut rx = self.snapshot_rx.clone();
        stream! {
            let current = rx.borrow_and_update().clone();
            yield current;
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                yield snapshot;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled() && !self.tx.is_closed()
    }

    /// Stops the session task and waits for it to exit.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("[SessionRuntime] Session task ended abnormally: {}", e);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Spawn
// ─────────────────────────────────────────────────────────────────────────────

/// Starts a session on a background task.
///
/// Subscribes to `monitor` before registering the SDK handlers, then calls
/// `connect()` exactly once.
pub fn spawn_session(
    deps: SessionDependencies,
    monitor: Arc<NetworkAvailabilityMonitor>,
    emitter: Arc<dyn EventEmitter>,
    placeholder_title: impl Into<String>,
    spawner: &TokioSpawner,
    cancel_token: CancellationToken,
) -> SessionHandle {
    let mut availability_rx = monitor.receiver();
    let mut coordinator = SessionCoordinator::new(
        deps.clone(),
        emitter,
        placeholder_title,
        monitor.current_availability(),
    );
    let snapshot_rx = coordinator.watch();

    let (tx, mut input_rx) = mpsc::unbounded_channel();
    let forwarder = Arc::new(SdkEventForwarder { tx: tx.clone() });
    deps.sdk.set_connection_handler(forwarder.clone());
    deps.sdk.set_listen_state_handler(forwarder.clone());
    deps.sdk.set_group_handler(forwarder);
    deps.sdk.set_log_handler(Arc::new(TracingLogSink));

    log::info!("[SessionRuntime] Connecting SDK");
    deps.sdk.connect();

    let token = cancel_token.clone();
    let task = spawner.spawn(async move {
        let mut availability_open = true;
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    log::info!("[SessionRuntime] Session cancelled");
                    break;
                }
                input = input_rx.recv() => match input {
                    Some(input) => coordinator.handle(input),
                    None => {
                        log::info!("[SessionRuntime] Input channel closed");
                        break;
                    }
                },
                result = availability_rx.recv(), if availability_open => match result {
                    Ok(available) => {
                        coordinator.handle(SessionInput::NetworkAvailability(available));
                    }
                    Err(RecvError::Lagged(n)) => {
                        let current = monitor.current_availability();
                        log::warn!(
                            "[SessionRuntime] Missed {} availability event(s), resyncing to {}",
                            n,
                            current
                        );
                        if current != coordinator.network_available() {
                            coordinator.handle(SessionInput::NetworkAvailability(current));
                        }
                    }
                    Err(RecvError::Closed) => {
                        log::warn!("[SessionRuntime] Availability channel closed");
                        availability_open = false;
                    }
                },
            }
        }
    });

    SessionHandle {
        tx,
        snapshot_rx,
        cancel_token,
        task: Arc::new(Mutex::new(Some(task))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::catalog::StreamEntry;
    use crate::events::{BroadcastEvent, BroadcastEventBridge, NoopEventEmitter, SessionEvent};
    use crate::media::{InMemoryNowPlayingSurface, NoopAudioOutput, RemoteCommand};
    use crate::network::{InterfaceKind, PathUpdate};
    use crate::sdk::{SdkStateQuery, SimulatedSdk};

    struct Harness {
        sdk: Arc<SimulatedSdk>,
        surface: Arc<InMemoryNowPlayingSurface>,
        monitor: Arc<NetworkAvailabilityMonitor>,
        handle: SessionHandle,
    }

    fn harness() -> Harness {
        harness_with_emitter(Arc::new(NoopEventEmitter))
    }

    fn harness_with_emitter(emitter: Arc<dyn EventEmitter>) -> Harness {
        let sdk = Arc::new(SimulatedSdk::start(
            7,
            vec![
                StreamGroup::new("News", vec![StreamEntry::new("a", "EN")]),
                StreamGroup::new(
                    "Sports",
                    vec![StreamEntry::new("b", "DE").muted(true)],
                ),
            ],
        ));
        let surface = Arc::new(InMemoryNowPlayingSurface::new());
        let monitor = Arc::new(NetworkAvailabilityMonitor::new(8));
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Wifi]));

        let handle = spawn_session(
            SessionDependencies {
                sdk: sdk.clone(),
                audio_output: Arc::new(NoopAudioOutput),
                now_playing: surface.clone(),
            },
            monitor.clone(),
            emitter,
            "Livestream",
            &TokioSpawner::current(),
            CancellationToken::new(),
        );

        Harness {
            sdk,
            surface,
            monitor,
            handle,
        }
    }

    async fn wait_for(
        handle: &SessionHandle,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = handle.watch();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("session closed")
            .clone();
        snapshot
    }

    #[tokio::test]
    async fn connects_and_loads_catalog() {
        let h = harness();
        let snapshot = wait_for(&h.handle, |s| s.streams.len() == 2).await;

        assert_eq!(snapshot.connection_state, SdkConnectionState::Connected);
        assert!(snapshot.network_available);
        assert_eq!(snapshot.streams[0].title, "News");
        assert!(snapshot.streams[1].muted);

        h.handle.shutdown().await;
        assert!(!h.handle.is_running());
    }

    #[tokio::test]
    async fn press_toggles_playback_through_sdk() {
        let h = harness();
        wait_for(&h.handle, |s| !s.streams.is_empty()).await;

        h.handle.on_stream_pressed("a").unwrap();
        wait_for(&h.handle, |s| s.active_stream_id.as_deref() == Some("a")).await;
        assert_eq!(h.sdk.active_stream().as_deref(), Some("a"));
        assert!(h.sdk.listen_state().is_playing());

        // Playback feedback publishes the owning group's title.
        tokio::time::timeout(Duration::from_secs(2), async {
            while h.surface.now_playing().is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(h.surface.now_playing().unwrap().title, "News");

        h.handle.on_stream_pressed("a").unwrap();
        wait_for(&h.handle, |s| s.active_stream_id.is_none()).await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while h.sdk.listen_state() != ListenState::Paused {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn remote_play_resumes_paused_stream() {
        let h = harness();
        wait_for(&h.handle, |s| !s.streams.is_empty()).await;

        h.handle.on_stream_pressed("b").unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !h.surface.has_handler(RemoteCommand::Pause) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert!(h.surface.dispatch(RemoteCommand::Pause));
        assert_eq!(h.sdk.listen_state(), ListenState::Paused);
        assert!(h.surface.dispatch(RemoteCommand::Play));
        assert!(h.sdk.listen_state().is_playing());

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn network_loss_and_recovery_reconnects() {
        let h = harness();
        wait_for(&h.handle, |s| {
            s.connection_state == SdkConnectionState::Connected
        })
        .await;

        h.monitor.handle_path_update(&PathUpdate::unsatisfied());
        let snapshot = wait_for(&h.handle, |s| {
            s.connection_state == SdkConnectionState::Disconnected
        })
        .await;
        assert!(!snapshot.network_available);

        h.monitor
            .handle_path_update(&PathUpdate::satisfied([InterfaceKind::Cellular]));
        let snapshot = wait_for(&h.handle, |s| {
            s.network_available && s.connection_state == SdkConnectionState::Connected
        })
        .await;
        assert_eq!(snapshot.streams.len(), 2);

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn snapshots_stream_starts_with_current_state() {
        use futures::StreamExt;

        let h = harness();
        wait_for(&h.handle, |s| !s.streams.is_empty()).await;

        let mut snapshots = Box::pin(h.handle.snapshots());
        let first = snapshots.next().await.unwrap();
        assert_eq!(first.streams.len(), 2);

        h.handle.on_stream_pressed("a").unwrap();
        let next = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let snapshot = snapshots.next().await.unwrap();
                if snapshot.active_stream_id.is_some() {
                    return snapshot;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(next.active_stream_id.as_deref(), Some("a"));

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn lifecycle_hooks_reach_sdk() {
        let h = harness();
        h.handle.on_went_to_background().unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !h.sdk.is_in_background() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        h.handle.on_went_to_foreground().unwrap();
        h.handle.on_appear().unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while h.sdk.is_in_background() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn transport_drop_while_online_reconnects_and_reloads() {
        let bridge = Arc::new(BroadcastEventBridge::new(64));
        let mut events = bridge.subscribe();
        let h = harness_with_emitter(bridge.clone());
        wait_for(&h.handle, |s| {
            s.connection_state == SdkConnectionState::Connected && s.streams.len() == 2
        })
        .await;

        h.sdk.drop_connection();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(BroadcastEvent::Session(SessionEvent::ReconnectRequested { .. })) =
                    events.recv().await
                {
                    break;
                }
            }
        })
        .await
        .unwrap();

        let snapshot = wait_for(&h.handle, |s| {
            s.connection_state == SdkConnectionState::Connected && s.streams.len() == 2
        })
        .await;
        assert!(snapshot.network_available);
        assert_eq!(h.sdk.connection_state(), SdkConnectionState::Connected);

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn incremental_catalog_feed_reaches_snapshot() {
        let h = harness();
        wait_for(&h.handle, |s| s.streams.len() == 2).await;

        h.sdk.publish_new_group(StreamGroup::new(
            "Music",
            vec![StreamEntry::new("x", "FR")],
        ));
        h.sdk.publish_group_update(StreamGroup::new(
            "News",
            vec![StreamEntry::new("a", "EN"), StreamEntry::new("a2", "FR")],
        ));
        h.sdk.publish_group_removal("Sports");

        let snapshot = wait_for(&h.handle, |s| {
            s.streams
                .iter()
                .map(|stream| stream.stream_id.as_str())
                .collect::<Vec<_>>()
                == ["a", "a2", "x"]
        })
        .await;
        let titles: Vec<&str> = snapshot.streams.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["News", "News", "Music"]);

        h.handle.shutdown().await;
    }
}
