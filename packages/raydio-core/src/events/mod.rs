//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the coordinator to emit events
//! - [`BroadcastEventBridge`] for WebSocket transport
//! - Event types per domain (network, session, catalog, playback)

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::sdk::SdkConnectionState;

/// Events broadcast to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Network availability changes as seen by the coordinator.
    Network(NetworkEvent),

    /// SDK connection lifecycle.
    Session(SessionEvent),

    /// Catalog changes.
    Catalog(CatalogEvent),

    /// Playback state changes.
    Playback(PlaybackEvent),
}

/// Events related to network availability.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NetworkEvent {
    /// Availability flipped or the interface changed.
    AvailabilityChanged {
        available: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to the SDK connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The SDK reported a new connection state.
    ConnectionStateChanged {
        state: SdkConnectionState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The coordinator asked the SDK to reconnect.
    ReconnectRequested {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to the stream catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CatalogEvent {
    /// A new catalog version was published.
    Updated {
        version: u64,
        #[serde(rename = "groupCount")]
        group_count: usize,
        #[serde(rename = "streamCount")]
        stream_count: usize,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events related to playback.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// The SDK reported playback of a stream.
    Started {
        #[serde(rename = "streamId")]
        stream_id: Option<String>,
        /// Title published to the now-playing surface.
        title: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The SDK reported a non-playing state.
    Stopped {
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl From<NetworkEvent> for BroadcastEvent {
    fn from(event: NetworkEvent) -> Self {
        BroadcastEvent::Network(event)
    }
}

impl From<SessionEvent> for BroadcastEvent {
    fn from(event: SessionEvent) -> Self {
        BroadcastEvent::Session(event)
    }
}

impl From<CatalogEvent> for BroadcastEvent {
    fn from(event: CatalogEvent) -> Self {
        BroadcastEvent::Catalog(event)
    }
}

impl From<PlaybackEvent> for BroadcastEvent {
    fn from(event: PlaybackEvent) -> Self {
        BroadcastEvent::Playback(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_category_and_type() {
        let event: BroadcastEvent = CatalogEvent::Updated {
            version: 3,
            group_count: 1,
            stream_count: 2,
            timestamp: 0,
        }
        .into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "catalog");
        assert_eq!(json["type"], "updated");
        assert_eq!(json["streamCount"], 2);
    }

    #[test]
    fn connection_state_serializes_camel_case() {
        let event: BroadcastEvent = SessionEvent::ConnectionStateChanged {
            state: SdkConnectionState::Connected,
            timestamp: 0,
        }
        .into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "session");
        assert_eq!(json["state"], "connected");
    }
}
