//! Builders for test snapshots.

use clusterview_masters::snapshot::{BatchResultsItem, MasterAddress, MastersGroup};
use clusterview_masters::{
    CellTag, MasterDataItem, MasterDataItemInfo, MasterRole, NodeState, RuntimeDataSnapshot,
    TopologySnapshot,
};
use serde_json::json;

fn group(cell_tag: Option<CellTag>, cell_id: Option<&str>, hosts: &[&str]) -> MastersGroup {
    MastersGroup {
        addresses: hosts.iter().map(|host| MasterAddress::new(*host)).collect(),
        cell_tag,
        cell_id: cell_id.map(str::to_string),
    }
}

/// Builds a [`TopologySnapshot`] group by group.
#[derive(Clone, Debug, Default)]
pub struct TopologyBuilder {
    snapshot: TopologySnapshot,
}

impl TopologyBuilder {
    /// Empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary cell.
    #[must_use]
    pub fn primary(mut self, cell_tag: CellTag, cell_id: &str, hosts: &[&str]) -> Self {
        self.snapshot.primary_master = group(Some(cell_tag), Some(cell_id), hosts);
        self
    }

    /// Appends a secondary cell.
    #[must_use]
    pub fn secondary(mut self, cell_tag: CellTag, cell_id: &str, hosts: &[&str]) -> Self {
        self.snapshot
            .secondary_masters
            .push(group(Some(cell_tag), Some(cell_id), hosts));
        self
    }

    /// Sets the timestamp providers.
    #[must_use]
    pub fn providers(mut self, cell_tag: CellTag, hosts: &[&str]) -> Self {
        self.snapshot.timestamp_providers = group(Some(cell_tag), None, hosts);
        self
    }

    /// Sets the discovery servers.
    #[must_use]
    pub fn discovery(mut self, cell_tag: CellTag, hosts: &[&str]) -> Self {
        self.snapshot.discovery_servers = group(Some(cell_tag), None, hosts);
        self
    }

    /// Sets the queue agents.
    #[must_use]
    pub fn queue_agents(mut self, hosts: &[&str]) -> Self {
        self.snapshot.queue_agents = group(None, None, hosts);
        self
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn build(self) -> TopologySnapshot {
        self.snapshot
    }
}

/// Builds a [`RuntimeDataSnapshot`] entry by entry, keeping `data` and `masterInfo` aligned.
#[derive(Clone, Debug, Default)]
pub struct RuntimeDataBuilder {
    snapshot: RuntimeDataSnapshot,
}

impl RuntimeDataBuilder {
    /// Empty runtime data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node reporting `state`.
    #[must_use]
    pub fn node(
        self,
        role: MasterRole,
        cell_tag: Option<CellTag>,
        host: &str,
        state: impl Into<NodeState>,
    ) -> Self {
        self.raw(
            role.as_str(),
            cell_tag,
            host,
            BatchResultsItem::ok(MasterDataItem::with_state(state)),
        )
    }

    /// Adds a node reporting `leading` at `committed_version`.
    #[must_use]
    pub fn leader(
        self,
        role: MasterRole,
        cell_tag: Option<CellTag>,
        host: &str,
        committed_version: &str,
    ) -> Self {
        self.raw(
            role.as_str(),
            cell_tag,
            host,
            BatchResultsItem::ok(MasterDataItem {
                state: Some(NodeState::Leading),
                committed_version: Some(committed_version.to_string()),
            }),
        )
    }

    /// Adds a node whose sub-request failed.
    #[must_use]
    pub fn failed(self, role: MasterRole, cell_tag: Option<CellTag>, host: &str) -> Self {
        self.raw(
            role.as_str(),
            cell_tag,
            host,
            BatchResultsItem::failed(json!({"message": format!("{host} is unreachable")})),
        )
    }

    /// Adds an entry with an arbitrary `type` string.
    #[must_use]
    pub fn raw(
        mut self,
        kind: &str,
        cell_tag: Option<CellTag>,
        host: &str,
        item: BatchResultsItem<MasterDataItem>,
    ) -> Self {
        self.snapshot.push(
            MasterDataItemInfo {
                host: host.to_string(),
                kind: kind.to_string(),
                cell_tag,
            },
            item,
        );
        self
    }

    /// Finishes the snapshot.
    #[must_use]
    pub fn build(self) -> RuntimeDataSnapshot {
        self.snapshot
    }
}
