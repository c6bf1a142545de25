//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the availability monitor and the
//! session are constructed exactly once here and handed to consumers
//! explicitly.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::{RaydioError, RaydioResult};
use crate::events::{BroadcastEvent, BroadcastEventBridge, EventEmitter};
use crate::media::{AudioOutput, InMemoryNowPlayingSurface, NowPlayingSurface};
use crate::network::{NetworkAvailabilityMonitor, PathSource};
use crate::runtime::TokioSpawner;
use crate::sdk::StreamingSdk;
use crate::services::{spawn_session, SessionDependencies, SessionHandle};
use crate::state::Config;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Debounced network availability.
    pub monitor: Arc<NetworkAvailabilityMonitor>,
    /// Handle to the running session coordinator.
    pub session: SessionHandle,
    /// Now-playing surface the coordinator publishes to.
    pub now_playing: Arc<InMemoryNowPlayingSurface>,
    /// Broadcast channel sender for real-time events.
    pub broadcast_tx: broadcast::Sender<BroadcastEvent>,
    /// Event bridge for emitting events to WebSocket and optional external consumers.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts path observation on a background task.
    pub fn start_background_tasks(&self, path_source: Box<dyn PathSource>) {
        Arc::clone(&self.monitor).start(path_source, &self.spawner);
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.monitor.stop();
        self.cancel_token.cancel();
        self.session.shutdown().await;

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services around the given SDK and audio output.
///
/// Wiring order:
///
/// 1. Shared infrastructure (broadcast channel, event bridge, cancellation token)
/// 2. Network availability monitor
/// 3. Now-playing surface
/// 4. Session coordinator task (subscribes to the monitor, registers SDK
///    handlers, connects)
///
/// Path observation is not started here; call
/// [`BootstrappedServices::start_background_tasks`] with a path source.
///
/// # Errors
///
/// Returns [`RaydioError::Configuration`] if `config` fails validation.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime context.
pub fn bootstrap_services(
    config: &Config,
    sdk: Arc<dyn StreamingSdk>,
    audio_output: Arc<dyn AudioOutput>,
) -> RaydioResult<BootstrappedServices> {
    config.validate().map_err(RaydioError::Configuration)?;

    let spawner = TokioSpawner::current();

    let (broadcast_tx, _) = broadcast::channel::<BroadcastEvent>(config.event_channel_capacity);
    let event_bridge = Arc::new(BroadcastEventBridge::with_sender(broadcast_tx.clone()));
    let cancel_token = CancellationToken::new();

    let monitor = Arc::new(NetworkAvailabilityMonitor::with_cancel_token(
        config.availability_channel_capacity,
        cancel_token.child_token(),
    ));
    let now_playing = Arc::new(InMemoryNowPlayingSurface::new());

    let session = spawn_session(
        SessionDependencies {
            sdk,
            audio_output,
            now_playing: Arc::clone(&now_playing) as Arc<dyn NowPlayingSurface>,
        },
        Arc::clone(&monitor),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        config.now_playing_placeholder_title.clone(),
        &spawner,
        cancel_token.child_token(),
    );

    Ok(BootstrappedServices {
        monitor,
        session,
        now_playing,
        broadcast_tx,
        event_bridge,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::catalog::{StreamEntry, StreamGroup};
    use crate::media::NoopAudioOutput;
    use crate::network::{InterfaceKind, PathUpdate};
    use crate::sdk::{SdkConnectionState, SimulatedSdk};

    fn sdk() -> Arc<SimulatedSdk> {
        Arc::new(SimulatedSdk::start(
            1,
            vec![StreamGroup::new("News", vec![StreamEntry::new("a", "EN")])],
        ))
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let config = Config {
            event_channel_capacity: 0,
            ..Config::default()
        };
        let result = bootstrap_services(&config, sdk(), Arc::new(NoopAudioOutput));
        assert!(matches!(result, Err(RaydioError::Configuration(_))));
    }

    #[tokio::test]
    async fn wires_monitor_into_session_and_shuts_down() {
        let services =
            bootstrap_services(&Config::default(), sdk(), Arc::new(NoopAudioOutput)).unwrap();
        let mut events = services.event_bridge.subscribe();

        let (tx, rx) = mpsc::channel(4);
        services.start_background_tasks(Box::new(rx));
        tx.send(PathUpdate::satisfied([InterfaceKind::WiredEthernet]))
            .await
            .unwrap();

        let mut watch = services.session.watch();
        tokio::time::timeout(
            Duration::from_secs(2),
            watch.wait_for(|s| {
                s.network_available
                    && s.connection_state == SdkConnectionState::Connected
                    && s.streams.len() == 1
            }),
        )
        .await
        .unwrap()
        .unwrap();

        let mut saw_network = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, BroadcastEvent::Network(_)) {
                saw_network = true;
            }
        }
        assert!(saw_network);

        services.shutdown().await;
        assert!(!services.session.is_running());
    }

    #[tokio::test]
    async fn root_token_stops_monitor_and_session() {
        let services =
            bootstrap_services(&Config::default(), sdk(), Arc::new(NoopAudioOutput)).unwrap();
        let (tx, rx) = mpsc::channel::<PathUpdate>(4);
        services.start_background_tasks(Box::new(rx));

        services.cancel_token.cancel();

        // The observation task drops its receiver once cancelled.
        tokio::time::timeout(Duration::from_secs(2), tx.closed())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while services.session.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
