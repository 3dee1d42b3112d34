//! Mock implementation of the masters source for testing purposes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod builders;
mod error;

pub use builders::{RuntimeDataBuilder, TopologyBuilder};
pub use error::Error;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use clusterview_masters::{MasterAlert, MastersSource, RuntimeDataSnapshot, TopologySnapshot};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    topology: Option<TopologySnapshot>,
    runtime_data: Option<RuntimeDataSnapshot>,
    alerts: Vec<MasterAlert>,
    failure: Option<String>,
    topology_fetches: usize,
    runtime_data_fetches: usize,
}

/// In-memory masters source whose snapshots can be swapped between fetches.
///
/// Clones share the same snapshots.
#[derive(Clone, Debug, Default)]
pub struct MockMastersSource {
    inner: Arc<RwLock<Inner>>,
}

impl MockMastersSource {
    /// Create a source serving the given snapshots.
    #[must_use]
    pub fn new(topology: TopologySnapshot, runtime_data: Option<RuntimeDataSnapshot>) -> Self {
        let source = Self::default();
        {
            let mut inner = source.inner.write();
            inner.topology = Some(topology);
            inner.runtime_data = runtime_data;
        }
        source
    }

    /// Create a source from snapshot files
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A snapshot file cannot be read
    /// - A snapshot file contains invalid JSON
    pub fn from_files<P: AsRef<Path>>(
        topology_path: P,
        runtime_data_path: Option<P>,
    ) -> Result<Self, Error> {
        let topology = TopologySnapshot::from_json(&read_file(topology_path.as_ref())?)
            .map_err(|e| Error::SnapshotFile(e.to_string()))?;

        let runtime_data = runtime_data_path
            .map(|path| {
                RuntimeDataSnapshot::from_json(&read_file(path.as_ref())?)
                    .map_err(|e| Error::SnapshotFile(e.to_string()))
            })
            .transpose()?;

        Ok(Self::new(topology, runtime_data))
    }

    /// Replace the topology served from now on.
    pub fn set_topology(&self, topology: TopologySnapshot) {
        self.inner.write().topology = Some(topology);
    }

    /// Replace the runtime data served from now on.
    pub fn set_runtime_data(&self, runtime_data: RuntimeDataSnapshot) {
        self.inner.write().runtime_data = Some(runtime_data);
    }

    /// Replace the alerts served from now on.
    pub fn set_alerts(&self, alerts: Vec<MasterAlert>) {
        self.inner.write().alerts = alerts;
    }

    /// Make every fetch fail until [`MockMastersSource::recover`] is called.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.inner.write().failure = Some(message.into());
    }

    /// Stop failing fetches.
    pub fn recover(&self) {
        self.inner.write().failure = None;
    }

    /// Number of topology fetches served or failed so far.
    #[must_use]
    pub fn topology_fetches(&self) -> usize {
        self.inner.read().topology_fetches
    }

    /// Number of runtime data fetches served or failed so far.
    #[must_use]
    pub fn runtime_data_fetches(&self) -> usize {
        self.inner.read().runtime_data_fetches
    }
}

fn read_file(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|e| {
        Error::SnapshotFile(format!(
            "Failed to read snapshot file {}: {}",
            path.display(),
            e
        ))
    })
}

#[async_trait]
impl MastersSource for MockMastersSource {
    type Error = Error;

    async fn fetch_topology(&self) -> Result<TopologySnapshot, Self::Error> {
        let mut inner = self.inner.write();
        inner.topology_fetches += 1;

        if let Some(message) = &inner.failure {
            return Err(Error::Unavailable(message.clone()));
        }

        inner
            .topology
            .clone()
            .ok_or_else(|| Error::NotInitialized("topology".to_string()))
    }

    async fn fetch_runtime_data(&self) -> Result<RuntimeDataSnapshot, Self::Error> {
        let mut inner = self.inner.write();
        inner.runtime_data_fetches += 1;

        if let Some(message) = &inner.failure {
            return Err(Error::Unavailable(message.clone()));
        }

        inner
            .runtime_data
            .clone()
            .ok_or_else(|| Error::NotInitialized("runtime data".to_string()))
    }

    async fn fetch_alerts(&self) -> Result<Vec<MasterAlert>, Self::Error> {
        let inner = self.inner.read();

        if let Some(message) = &inner.failure {
            return Err(Error::Unavailable(message.clone()));
        }

        Ok(inner.alerts.clone())
    }
}
