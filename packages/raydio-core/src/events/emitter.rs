//! Event emitter abstraction for decoupling the coordinator from transport.

use super::{CatalogEvent, NetworkEvent, PlaybackEvent, SessionEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn on_offline(&self) {
///         self.emitter.emit_network(NetworkEvent::AvailabilityChanged { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a network availability event.
    fn emit_network(&self, event: NetworkEvent);

    /// Emits an SDK connection event.
    fn emit_session(&self, event: SessionEvent);

    /// Emits a catalog event.
    fn emit_catalog(&self, event: CatalogEvent);

    /// Emits a playback event.
    fn emit_playback(&self, event: PlaybackEvent);
}

/// No-op emitter for embedding without an event transport, and for tests.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_network(&self, _event: NetworkEvent) {}
    fn emit_session(&self, _event: SessionEvent) {}
    fn emit_catalog(&self, _event: CatalogEvent) {}
    fn emit_playback(&self, _event: PlaybackEvent) {}
}

/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_network(&self, event: NetworkEvent) {
        tracing::debug!(?event, "network_event");
    }

    fn emit_session(&self, event: SessionEvent) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_catalog(&self, event: CatalogEvent) {
        tracing::debug!(?event, "catalog_event");
    }

    fn emit_playback(&self, event: PlaybackEvent) {
        tracing::debug!(?event, "playback_event");
    }
}
