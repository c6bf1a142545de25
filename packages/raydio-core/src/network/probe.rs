//! Raw path sources feeding the availability monitor.
//!
//! [`InterfaceProbe`] is the default source for headless hosts: it scans the
//! local interface list on an interval and reports a new [`PathUpdate`]
//! whenever the set of usable interfaces changes. Any
//! `tokio::sync::mpsc::Receiver<PathUpdate>` is also a source, which lets an
//! embedding application forward its platform's native reachability callbacks.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{InterfaceKind, PathUpdate};
use crate::error::ErrorCode;

/// Producer of raw path updates.
#[async_trait]
pub trait PathSource: Send {
    /// Waits for the next path update. `None` ends observation.
    async fn next_update(&mut self) -> Option<PathUpdate>;
}

#[async_trait]
impl PathSource for mpsc::Receiver<PathUpdate> {
    async fn next_update(&mut self) -> Option<PathUpdate> {
        self.recv().await
    }
}

/// Errors from enumerating host interfaces.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to list network interfaces: {0}")]
    Listing(String),
}

impl ErrorCode for ProbeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Listing(_) => "interface_listing_failed",
        }
    }
}

/// Lists `(interface name, address)` pairs of the host.
pub trait InterfaceLister: Send + Sync {
    fn list(&self) -> Result<Vec<(String, IpAddr)>, ProbeError>;
}

/// Lister backed by the operating system's interface table.
#[derive(Debug, Clone, Default)]
pub struct LocalInterfaceLister;

impl InterfaceLister for LocalInterfaceLister {
    fn list(&self) -> Result<Vec<(String, IpAddr)>, ProbeError> {
        local_ip_address::list_afinet_netifas().map_err(|e| ProbeError::Listing(e.to_string()))
    }
}

/// Maps an interface name to its kind using common naming conventions
/// (Linux, BSD/macOS, Android).
#[must_use]
pub fn classify_interface_name(name: &str) -> InterfaceKind {
    let name = name.to_ascii_lowercase();
    let starts = |prefixes: &[&str]| prefixes.iter().any(|p| name.starts_with(p));

    if starts(&["wwan", "rmnet", "pdp_ip", "ccmni"]) {
        InterfaceKind::Cellular
    } else if starts(&["wl", "wifi", "ath"]) {
        InterfaceKind::Wifi
    } else if starts(&["eth", "en", "em"]) {
        InterfaceKind::WiredEthernet
    } else {
        InterfaceKind::Other
    }
}

fn is_usable(ip: &IpAddr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return false;
    }
    match ip {
        IpAddr::V4(v4) => !v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) != 0xfe80,
    }
}

/// Builds a path update from a host interface listing.
///
/// Only interfaces with a routable address count. Kinds are reported once
/// each, in precedence order, so equal listings produce equal updates.
#[must_use]
pub fn path_update_from_interfaces(interfaces: &[(String, IpAddr)]) -> PathUpdate {
    let present: Vec<InterfaceKind> = interfaces
        .iter()
        .filter(|(_, ip)| is_usable(ip))
        .map(|(name, _)| classify_interface_name(name))
        .collect();

    let kinds: Vec<InterfaceKind> = InterfaceKind::PRECEDENCE
        .into_iter()
        .filter(|kind| present.contains(kind))
        .collect();

    if kinds.is_empty() {
        PathUpdate::unsatisfied()
    } else {
        PathUpdate::satisfied(kinds)
    }
}

/// Polling path source over the host's interface table.
pub struct InterfaceProbe {
    lister: Box<dyn InterfaceLister>,
    interval: Duration,
    last: Option<PathUpdate>,
    started: bool,
}

impl InterfaceProbe {
    /// Creates a probe over the local interface table.
    pub fn new(interval: Duration) -> Self {
        Self::with_lister(Box::new(LocalInterfaceLister), interval)
    }

    /// Creates a probe over a custom lister.
    pub fn with_lister(lister: Box<dyn InterfaceLister>, interval: Duration) -> Self {
        Self {
            lister,
            interval,
            last: None,
            started: false,
        }
    }
}

#[async_trait]
impl PathSource for InterfaceProbe {
    async fn next_update(&mut self) -> Option<PathUpdate> {
        loop {
            if self.started {
                tokio::time::sleep(self.interval).await;
            }
            self.started = true;

            let update = match self.lister.list() {
                Ok(interfaces) => path_update_from_interfaces(&interfaces),
                Err(e) => {
                    log::warn!("[InterfaceProbe] {} ({})", e, e.code());
                    continue;
                }
            };

            if self.last.as_ref() != Some(&update) {
                log::debug!("[InterfaceProbe] Path changed: {:?}", update);
                self.last = Some(update.clone());
                return Some(update);
            }
        }
    }
}
