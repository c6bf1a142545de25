//! Raydio Core - connectivity-aware live audio session coordination.
//!
//! This crate tracks network reachability, drives the connection lifecycle of
//! a streaming SDK session, flattens the SDK's grouped stream catalog into a
//! presentable list, enforces single-active-stream playback and feeds the OS
//! "now playing" surface.
//!
//! # Architecture
//!
//! - [`network`]: Path observation and the debounced [`NetworkAvailabilityMonitor`]
//! - [`catalog`]: Stream groups, the flattened stream list and the catalog store
//! - [`sdk`]: Trait seams for the streaming SDK plus an in-process [`SimulatedSdk`]
//! - [`media`]: Now-playing surface and audio output abstractions
//! - [`services`]: The session coordinator and the task that owns it
//! - [`events`]: Event system for real-time client communication
//! - [`bootstrap`]: Composition root
//! - [`api`]: HTTP/WebSocket presentation surface
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`PathSource`](network::PathSource): Raw path updates
//! - [`StreamingSdk`](sdk::StreamingSdk): SDK operations and callback registration
//! - [`NowPlayingSurface`](media::NowPlayingSurface) and [`AudioOutput`](media::AudioOutput)
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod events;
pub mod media;
pub mod network;
pub mod runtime;
pub mod sdk;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use catalog::{flatten, Catalog, Stream, StreamEntry, StreamGroup};
pub use error::{ErrorCode, RaydioError, RaydioResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, CatalogEvent, EventEmitter, LoggingEventEmitter,
    NetworkEvent, NoopEventEmitter, PlaybackEvent, SessionEvent,
};
pub use media::{
    AudioOutput, AudioOutputError, InMemoryNowPlayingSurface, NoopAudioOutput, NowPlayingInfo,
    NowPlayingSurface, RemoteCommand,
};
pub use network::{
    InterfaceKind, InterfaceProbe, NetworkAvailabilityMonitor, PathSource, PathStatus, PathUpdate,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use sdk::{ListenState, SdkConnectionState, SimulatedSdk, StreamingSdk};
pub use services::{SessionHandle, SessionSnapshot};
pub use state::Config;
pub use utils::now_millis;

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{bind, start_server, AppState, ServerError};
