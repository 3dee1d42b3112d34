//! Abstract interface for fetching master snapshots from a cluster.

use async_trait::async_trait;

use crate::error::MastersSourceError;
use crate::snapshot::{MasterAlert, RuntimeDataSnapshot, TopologySnapshot};

/// Abstract interface for fetching master topology, runtime data and alerts.
///
/// Implementations own transport, retries and decoding; each call returns one
/// complete snapshot or an error.
#[async_trait]
pub trait MastersSource
where
    Self: Send + Sync + 'static,
{
    /// The error type for this source.
    type Error: MastersSourceError;

    /// Fetch which nodes make up which master group.
    async fn fetch_topology(&self) -> Result<TopologySnapshot, Self::Error>;

    /// Fetch the runtime state of every master node.
    async fn fetch_runtime_data(&self) -> Result<RuntimeDataSnapshot, Self::Error>;

    /// Fetch the alerts currently raised by the masters.
    async fn fetch_alerts(&self) -> Result<Vec<MasterAlert>, Self::Error>;
}
