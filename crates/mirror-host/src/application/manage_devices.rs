//! ManageDevicesUseCase: the visible device list and its discovery poll.
//!
//! The [`DeviceRegistry`] is the host's in-memory list of devices the bridge
//! currently reports.  It always contains the placeholder entry
//! ([`mirror_core::PLACEHOLDER_SERIAL`]) meaning "no device selected"; no
//! poll can remove it.
//!
//! [`DevicePoller::poll`] asks the bridge for the current listing and
//! reconciles it with the registry, returning which serials appeared,
//! vanished, or stayed.  A second poll against an unchanged listing yields
//! empty `appeared` and `vanished` sets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use mirror_core::domain::device::is_placeholder_serial;
use mirror_core::listing::parse_device_listing;
use mirror_core::Device;
use thiserror::Error;
use tracing::{debug, info};

use super::transport::{DeviceBridge, TransportError};

/// Error type for discovery and reconnection ticks.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The device listing command failed or timed out.
    #[error("device listing poll failed: {0}")]
    PollFailed(#[source] TransportError),

    /// A disconnect or reconnect command for one device failed.
    #[error("`{command}` for {serial} failed: {source}")]
    ReconnectCommand {
        serial: String,
        command: &'static str,
        #[source]
        source: TransportError,
    },
}

/// Result of reconciling a listing with the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    pub appeared: BTreeSet<String>,
    pub vanished: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl RegistryDiff {
    /// `true` when no serial appeared or vanished.
    pub fn is_stable(&self) -> bool {
        self.appeared.is_empty() && self.vanished.is_empty()
    }
}

/// In-memory list of devices visible to the user.
///
/// Serials are kept in a `BTreeMap` so [`snapshot`](Self::snapshot) has a
/// stable order without a separate sort.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, Device>,
}

/// Registry shared between the poll task, the session controller, and the
/// presentation bridge.
pub type SharedRegistry = Arc<RwLock<DeviceRegistry>>;

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry wrapped for sharing.
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Replaces the known set with `listing` and reports the difference.
    ///
    /// Unchanged devices get their status and display name refreshed.  A
    /// listing entry that uses the placeholder serial is ignored.
    pub fn reconcile(&mut self, listing: &[Device]) -> RegistryDiff {
        let mut diff = RegistryDiff::default();
        let mut next = BTreeMap::new();

        for device in listing.iter().filter(|d| !d.is_placeholder()) {
            if self.devices.contains_key(&device.serial) {
                diff.unchanged.insert(device.serial.clone());
            } else {
                diff.appeared.insert(device.serial.clone());
            }
            next.insert(device.serial.clone(), device.clone());
        }

        for serial in self.devices.keys() {
            if !next.contains_key(serial) {
                diff.vanished.insert(serial.clone());
            }
        }

        self.devices = next;
        diff
    }

    /// Current device list, placeholder first.
    pub fn snapshot(&self) -> Vec<Device> {
        std::iter::once(Device::placeholder())
            .chain(self.devices.values().cloned())
            .collect()
    }

    /// `true` if `serial` is listed.  The placeholder is always listed.
    pub fn contains(&self, serial: &str) -> bool {
        is_placeholder_serial(serial) || self.devices.contains_key(serial)
    }

    pub fn get(&self, serial: &str) -> Option<&Device> {
        self.devices.get(serial)
    }

    /// Number of real devices (the placeholder is not counted).
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Read-locks a shared registry, tolerating poisoning.
pub fn read_registry(registry: &SharedRegistry) -> RwLockReadGuard<'_, DeviceRegistry> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-locks a shared registry, tolerating poisoning.
pub fn write_registry(registry: &SharedRegistry) -> RwLockWriteGuard<'_, DeviceRegistry> {
    registry.write().unwrap_or_else(PoisonError::into_inner)
}

/// Polls the bridge and keeps a [`SharedRegistry`] in sync with it.
pub struct DevicePoller {
    bridge: Arc<dyn DeviceBridge>,
    registry: SharedRegistry,
}

impl DevicePoller {
    pub fn new(bridge: Arc<dyn DeviceBridge>, registry: SharedRegistry) -> Self {
        Self { bridge, registry }
    }

    /// Queries the bridge once and reconciles the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::PollFailed`] if the listing command fails.
    /// The registry is left unchanged in that case.
    pub async fn poll(&self) -> Result<RegistryDiff, DiscoveryError> {
        let listing = self
            .bridge
            .devices_listing()
            .await
            .map_err(DiscoveryError::PollFailed)?;
        let devices = parse_device_listing(&listing);

        let diff = write_registry(&self.registry).reconcile(&devices);

        if diff.is_stable() {
            debug!(devices = diff.unchanged.len(), "device list unchanged");
        } else {
            info!(
                appeared = ?diff.appeared,
                vanished = ?diff.vanished,
                "device list changed"
            );
        }
        Ok(diff)
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }
}
