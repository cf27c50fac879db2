//! ReconnectUseCase: bounce devices the bridge reports as offline.
//!
//! Network-attached devices (`adb connect 10.0.0.7:5555`) regularly drop to
//! `offline` when Wi-Fi flaps.  Each [`Reconnector::tick`] lists the devices,
//! and for every non-emulator line carrying the `offline` marker issues a
//! `disconnect` followed by a `connect`.
//!
//! A failing command is logged and recorded in the [`ReconnectReport`]; the
//! remaining devices of the same tick are still attempted.  The reconnect is
//! issued even if the disconnect failed.

use std::sync::Arc;

use mirror_core::listing::offline_serials;
use tracing::{info, warn};

use super::manage_devices::DiscoveryError;
use super::transport::DeviceBridge;

/// Outcome of one reconnect tick.
#[derive(Debug, Default)]
pub struct ReconnectReport {
    /// Offline serials a disconnect/connect pair was issued for.
    pub attempted: Vec<String>,
    /// Per-command failures.
    pub failures: Vec<DiscoveryError>,
}

/// Periodic reconnection of offline devices.
pub struct Reconnector {
    bridge: Arc<dyn DeviceBridge>,
}

impl Reconnector {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self { bridge }
    }

    /// Runs one reconnect pass.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::PollFailed`] only if the listing itself
    /// could not be obtained.  Command failures for individual devices are
    /// collected in the report.
    pub async fn tick(&self) -> Result<ReconnectReport, DiscoveryError> {
        let listing = self
            .bridge
            .devices_listing()
            .await
            .map_err(DiscoveryError::PollFailed)?;

        let mut report = ReconnectReport::default();
        for serial in offline_serials(&listing) {
            info!(%serial, "device offline, reconnecting");

            if let Err(source) = self.bridge.disconnect(&serial).await {
                warn!(%serial, error = %source, "disconnect failed");
                report.failures.push(DiscoveryError::ReconnectCommand {
                    serial: serial.clone(),
                    command: "disconnect",
                    source,
                });
            }
            if let Err(source) = self.bridge.connect(&serial).await {
                warn!(%serial, error = %source, "reconnect failed");
                report.failures.push(DiscoveryError::ReconnectCommand {
                    serial: serial.clone(),
                    command: "connect",
                    source,
                });
            }
            report.attempted.push(serial);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transport::{MockDeviceBridge, TransportError};
    use mockall::predicate::eq;
    use mockall::Sequence;

    const LISTING: &str = "List of devices attached\n\
        D1\toffline\n\
        D2\tdevice\n\
        emulator-5554\toffline\n";

    #[tokio::test]
    async fn test_tick_bounces_only_offline_non_emulator_devices() {
        // Arrange
        let mut bridge = MockDeviceBridge::new();
        let mut seq = Sequence::new();
        bridge
            .expect_devices_listing()
            .times(1)
            .returning(|| Ok(LISTING.to_string()));
        bridge
            .expect_disconnect()
            .withf(|serial: &str| serial == "D1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        bridge
            .expect_connect()
            .withf(|serial: &str| serial == "D1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let reconnector = Reconnector::new(Arc::new(bridge));

        // Act
        let report = reconnector.tick().await.expect("tick succeeds");

        // Assert – mock expectations verify exactly one pair for D1 and none
        // for D2 or the emulator
        assert_eq!(report.attempted, vec!["D1".to_string()]);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failed_disconnect_still_reconnects_and_continues() {
        // Arrange
        let mut bridge = MockDeviceBridge::new();
        bridge
            .expect_devices_listing()
            .returning(|| Ok("A\toffline\nB\toffline\n".to_string()));
        bridge
            .expect_disconnect()
            .with(eq("A"))
            .returning(|_| Err(TransportError::Closed));
        bridge.expect_disconnect().with(eq("B")).returning(|_| Ok(()));
        bridge.expect_connect().times(2).returning(|_| Ok(()));
        let reconnector = Reconnector::new(Arc::new(bridge));

        // Act
        let report = reconnector.tick().await.expect("tick succeeds");

        // Assert
        assert_eq!(report.attempted, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            DiscoveryError::ReconnectCommand { serial, command: "disconnect", .. } if serial == "A"
        ));
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported_as_poll_error() {
        let mut bridge = MockDeviceBridge::new();
        bridge
            .expect_devices_listing()
            .returning(|| Err(TransportError::Protocol("garbage".to_string())));
        let reconnector = Reconnector::new(Arc::new(bridge));

        let result = reconnector.tick().await;

        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_no_offline_devices_issues_no_commands() {
        let mut bridge = MockDeviceBridge::new();
        bridge
            .expect_devices_listing()
            .returning(|| Ok("List of devices attached\nD2\tdevice\n".to_string()));
        bridge.expect_disconnect().never();
        bridge.expect_connect().never();
        let reconnector = Reconnector::new(Arc::new(bridge));

        let report = tokio_test::assert_ok!(reconnector.tick().await);

        assert!(report.attempted.is_empty());
    }
}
