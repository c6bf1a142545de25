//! Network availability tracking.
//!
//! Raw path updates (from the OS, the [`InterfaceProbe`], or a test channel)
//! are fed into a [`NetworkAvailabilityMonitor`], which debounces them into a
//! boolean availability signal:
//!
//! - an unsatisfied path always publishes `false` and forgets the interface;
//! - a satisfied path publishes `true` only when coming back from unavailable,
//!   on the first interface seen, or when the interface kind changes.
//!
//! Repeated satisfied updates on the same interface are suppressed so that
//! path churn does not trigger redundant reconnects downstream.

mod probe;

pub use probe::{
    classify_interface_name, path_update_from_interfaces, InterfaceLister, InterfaceProbe,
    LocalInterfaceLister, PathSource, ProbeError,
};

use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

use crate::runtime::{TaskSpawner, TokioSpawner};

/// Kind of network interface a path is routed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceKind {
    Cellular,
    Wifi,
    WiredEthernet,
    Other,
}

impl InterfaceKind {
    /// Selection order when a path uses several interfaces at once.
    pub const PRECEDENCE: [InterfaceKind; 4] = [
        InterfaceKind::Cellular,
        InterfaceKind::Wifi,
        InterfaceKind::WiredEthernet,
        InterfaceKind::Other,
    ];
}

/// Reachability status of a network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
    /// A connection must be brought up (e.g. on-demand VPN) before traffic flows.
    RequiresConnection,
}

/// One raw "path changed" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathUpdate {
    pub status: PathStatus,
    /// Interfaces the path currently uses, in no particular order.
    pub interfaces: Vec<InterfaceKind>,
}

impl PathUpdate {
    pub fn satisfied(interfaces: impl Into<Vec<InterfaceKind>>) -> Self {
        Self {
            status: PathStatus::Satisfied,
            interfaces: interfaces.into(),
        }
    }

    pub fn unsatisfied() -> Self {
        Self {
            status: PathStatus::Unsatisfied,
            interfaces: Vec::new(),
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == PathStatus::Satisfied
    }

    pub fn uses(&self, kind: InterfaceKind) -> bool {
        self.interfaces.contains(&kind)
    }

    /// Picks the interface kind this path is attributed to.
    ///
    /// Cellular wins over wifi, wifi over wired ethernet; anything else is
    /// `Other`.
    pub fn primary_interface(&self) -> InterfaceKind {
        InterfaceKind::PRECEDENCE
            .into_iter()
            .find(|kind| *kind != InterfaceKind::Other && self.uses(*kind))
            .unwrap_or(InterfaceKind::Other)
    }
}

#[derive(Debug, Default)]
struct AvailabilityState {
    available: bool,
    interface: Option<InterfaceKind>,
}

/// Debounces raw path updates into availability-changed events.
///
/// The monitor is a leaf component: it never fails and has no dependencies
/// besides the [`PathSource`] it is started with.
pub struct NetworkAvailabilityMonitor {
    state: Mutex<AvailabilityState>,
    tx: broadcast::Sender<bool>,
    cancel_token: CancellationToken,
}

impl NetworkAvailabilityMonitor {
    /// Creates a monitor whose subscribers can buffer up to `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 (see [`tokio::sync::broadcast::channel`]).
    pub fn new(capacity: usize) -> Self {
        Self::with_cancel_token(capacity, CancellationToken::new())
    }

    /// Creates a monitor whose observation task also stops when
    /// `cancel_token` is cancelled.
    pub fn with_cancel_token(capacity: usize, cancel_token: CancellationToken) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            state: Mutex::new(AvailabilityState::default()),
            tx,
            cancel_token,
        }
    }

    /// Last known availability. `false` until the first update arrives.
    pub fn current_availability(&self) -> bool {
        self.state.lock().available
    }

    /// Interface the last satisfied path was attributed to.
    pub fn current_interface(&self) -> Option<InterfaceKind> {
        self.state.lock().interface
    }

    /// Returns a stream of availability changes emitted after this call.
    ///
    /// Events a slow subscriber missed are skipped.
    pub fn subscribe(&self) -> impl Stream<Item = bool> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(available) => Some(available),
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    log::warn!("[NetworkMonitor] Subscriber lagged, skipped {} event(s)", n);
                    None
                }
            }
        })
    }

    /// Returns a raw receiver for callers that multiplex with `select!`.
    pub fn receiver(&self) -> broadcast::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Applies one raw path update, publishing an event if availability changed.
    ///
    /// Returns the published value, or `None` if the update was suppressed.
    pub fn handle_path_update(&self, update: &PathUpdate) -> Option<bool> {
        // Held across publish so concurrent callers cannot reorder events.
        let mut state = self.state.lock();

        if !update.is_satisfied() {
            state.available = false;
            state.interface = None;
            log::info!("[NetworkMonitor] Path {:?}, network unavailable", update.status);
            self.publish(false);
            return Some(false);
        }

        let interface = update.primary_interface();
        let unchanged = state.available && state.interface == Some(interface);
        if unchanged {
            log::trace!("[NetworkMonitor] Path unchanged on {:?}", interface);
            return None;
        }

        let previous = state.interface;
        state.available = true;
        state.interface = Some(interface);

        log::info!(
            "[NetworkMonitor] Network available via {:?} (previous: {:?})",
            interface,
            previous
        );
        self.publish(true);
        Some(true)
    }

    fn publish(&self, available: bool) {
        if let Err(e) = self.tx.send(available) {
            log::trace!("[NetworkMonitor] No availability subscribers: {}", e);
        }
    }

    /// Starts observing `source` on a background task.
    ///
    /// The task runs until the source ends or [`stop`](Self::stop) is called.
    pub fn start(self: Arc<Self>, mut source: Box<dyn PathSource>, spawner: &TokioSpawner) {
        let cancel_token = self.cancel_token.clone();
        spawner.spawn(async move {
            log::info!("[NetworkMonitor] Path observation started");
            loop {
                let update = tokio::select! {
                    _ = cancel_token.cancelled() => {
                        log::info!("[NetworkMonitor] Path observation cancelled");
                        break;
                    }
                    update = source.next_update() => update,
                };
                match update {
                    Some(update) => {
                        self.handle_path_update(&update);
                    }
                    None => {
                        log::info!("[NetworkMonitor] Path source ended");
                        break;
                    }
                }
            }
        });
    }

    /// Stops the background observation task, if running.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::mpsc;

    fn drain(rx: &mut broadcast::Receiver<bool>) -> Vec<bool> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(v) => out.push(v),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[test]
    fn defaults_to_unavailable() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        assert!(!monitor.current_availability());
        assert_eq!(monitor.current_interface(), None);
    }

    #[test]
    fn repeated_same_interface_emits_once() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        let mut rx = monitor.receiver();

        for _ in 0..4 {
            monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Wifi]));
        }

        assert_eq!(drain(&mut rx), vec![true]);
        assert!(monitor.current_availability());
    }

    #[test]
    fn interface_switch_reemits_true() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        let mut rx = monitor.receiver();

        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Cellular]));
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Wifi]));

        assert_eq!(drain(&mut rx), vec![true, true]);
        assert_eq!(monitor.current_interface(), Some(InterfaceKind::Wifi));
    }

    #[test]
    fn unsatisfied_always_emits_false() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        let mut rx = monitor.receiver();

        monitor.handle_path_update(&PathUpdate::unsatisfied());
        monitor.handle_path_update(&PathUpdate::unsatisfied());

        assert_eq!(drain(&mut rx), vec![false, false]);
    }

    #[test]
    fn recovery_on_same_interface_emits_true() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        let mut rx = monitor.receiver();

        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::WiredEthernet]));
        monitor.handle_path_update(&PathUpdate::unsatisfied());
        assert_eq!(monitor.current_interface(), None);
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::WiredEthernet]));

        assert_eq!(drain(&mut rx), vec![true, false, true]);
    }

    #[test]
    fn requires_connection_counts_as_unavailable() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Wifi]));
        let result = monitor.handle_path_update(&PathUpdate {
            status: PathStatus::RequiresConnection,
            interfaces: vec![InterfaceKind::Wifi],
        });
        assert_eq!(result, Some(false));
        assert!(!monitor.current_availability());
    }

    #[test]
    fn primary_interface_follows_precedence() {
        use InterfaceKind::*;
        assert_eq!(
            PathUpdate::satisfied([Other, WiredEthernet, Wifi, Cellular]).primary_interface(),
            Cellular
        );
        assert_eq!(
            PathUpdate::satisfied([WiredEthernet, Wifi]).primary_interface(),
            Wifi
        );
        assert_eq!(
            PathUpdate::satisfied([Other, WiredEthernet]).primary_interface(),
            WiredEthernet
        );
        assert_eq!(PathUpdate::satisfied([Other]).primary_interface(), Other);
        assert_eq!(PathUpdate::satisfied(Vec::<InterfaceKind>::new()).primary_interface(), Other);
    }

    #[test]
    fn subscribers_only_see_later_changes() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Wifi]));

        let mut early = monitor.receiver();
        monitor.handle_path_update(&PathUpdate::unsatisfied());
        let mut late = monitor.receiver();
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Wifi]));

        assert_eq!(drain(&mut early), vec![false, true]);
        assert_eq!(drain(&mut late), vec![true]);
    }

    #[tokio::test]
    async fn subscribe_stream_yields_changes() {
        let monitor = NetworkAvailabilityMonitor::new(8);
        let stream = monitor.subscribe();
        tokio::pin!(stream);

        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Cellular]));
        monitor.handle_path_update(&PathUpdate::satisfied([InterfaceKind::Cellular]));
        monitor.handle_path_update(&PathUpdate::unsatisfied());

        assert_eq!(stream.next().await, Some(true));
        assert_eq!(stream.next().await, Some(false));
    }

    #[tokio::test]
    async fn start_consumes_path_source_until_closed() {
        let monitor = Arc::new(NetworkAvailabilityMonitor::new(8));
        let mut rx = monitor.receiver();
        let (tx, source) = mpsc::channel(8);

        Arc::clone(&monitor).start(Box::new(source), &TokioSpawner::current());

        tx.send(PathUpdate::satisfied([InterfaceKind::Wifi]))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), true);

        tx.send(PathUpdate::unsatisfied()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), false);

        monitor.stop();
    }
}
