//! Configuration of the masters monitor

use std::time::Duration;

use crate::error::MastersError;

/// Default refresh interval for topology snapshots
const DEFAULT_TOPOLOGY_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Default refresh interval for runtime data snapshots
const DEFAULT_RUNTIME_DATA_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Default refresh interval for alerts
const DEFAULT_ALERTS_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Default time to wait for background tasks on shutdown
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the masters monitor
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MastersMonitorConfig {
    /// Interval at which to refresh the topology
    pub topology_refresh_interval: Duration,

    /// Interval at which to refresh runtime data
    pub runtime_data_refresh_interval: Duration,

    /// Interval at which to refresh alerts
    pub alerts_refresh_interval: Duration,

    /// How long shutdown waits for background tasks
    pub shutdown_timeout: Duration,
}

impl MastersMonitorConfig {
    /// Checks that every interval is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`MastersError::Configuration`] naming the first zero interval.
    pub fn validate(&self) -> Result<(), MastersError> {
        let intervals = [
            ("topology_refresh_interval", self.topology_refresh_interval),
            (
                "runtime_data_refresh_interval",
                self.runtime_data_refresh_interval,
            ),
            ("alerts_refresh_interval", self.alerts_refresh_interval),
        ];

        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(MastersError::Configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}

impl Default for MastersMonitorConfig {
    fn default() -> Self {
        Self {
            topology_refresh_interval: DEFAULT_TOPOLOGY_REFRESH_INTERVAL,
            runtime_data_refresh_interval: DEFAULT_RUNTIME_DATA_REFRESH_INTERVAL,
            alerts_refresh_interval: DEFAULT_ALERTS_REFRESH_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}
