//! Fixed values shared by the monitor, the coordinator and the API layer.

// ─────────────────────────────────────────────────────────────────────────────
// Now Playing
// ─────────────────────────────────────────────────────────────────────────────

/// Title published to the now-playing surface when the active stream has no
/// owning group in the SDK's current catalog.
pub const DEFAULT_NOW_PLAYING_TITLE: &str = "Livestream";

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the outward event broadcast channel (WebSocket clients).
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the availability broadcast channel.
///
/// Availability changes are rare; a subscriber lagging this far behind has
/// stopped polling and gets resynchronised from the monitor's current state.
pub const AVAILABILITY_CHANNEL_CAPACITY: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Interface Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Default interval between host interface scans (milliseconds).
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 2000;

/// Lower bound for the probe interval (milliseconds).
pub const MIN_PROBE_INTERVAL_MS: u64 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "raydio";
