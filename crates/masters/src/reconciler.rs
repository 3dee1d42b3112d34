//! Reconciliation of topology and runtime data into the masters aggregate.
//!
//! Topology and runtime data arrive independently and in any order. Both
//! entry points take the previous aggregate by reference and return a new
//! one; nothing reachable from the previous aggregate is modified.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::counters::{self, MasterCounters};
use crate::group::{self, MasterGroup};
use crate::node::{MasterRole, NodeKey, NodeRecord};
use crate::snapshot::{
    MasterAlert, MasterDataItem, MastersGroup, RuntimeDataSnapshot, TopologySnapshot,
};

/// Aggregated view of every master group plus derived counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    primary: MasterGroup,
    secondary: Vec<MasterGroup>,
    providers: MasterGroup,
    discovery: MasterGroup,
    queue_agents: MasterGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    counters: Option<MasterCounters>,
    alerts: Vec<MasterAlert>,
    #[serde(skip)]
    topology: Option<Arc<TopologySnapshot>>,
    #[serde(skip)]
    runtime_data: Option<Arc<RuntimeDataSnapshot>>,
}

impl AggregateState {
    /// The primary master cell.
    pub const fn primary(&self) -> &MasterGroup {
        &self.primary
    }

    /// Secondary master cells, in topology order.
    pub fn secondary(&self) -> &[MasterGroup] {
        &self.secondary
    }

    /// Timestamp providers.
    pub const fn providers(&self) -> &MasterGroup {
        &self.providers
    }

    /// Discovery servers.
    pub const fn discovery(&self) -> &MasterGroup {
        &self.discovery
    }

    /// Queue agents.
    pub const fn queue_agents(&self) -> &MasterGroup {
        &self.queue_agents
    }

    /// Derived counters, `None` until runtime data has been applied.
    pub const fn counters(&self) -> Option<&MasterCounters> {
        self.counters.as_ref()
    }

    /// Current alerts.
    pub fn alerts(&self) -> &[MasterAlert] {
        &self.alerts
    }

    /// Last applied topology snapshot.
    pub fn topology(&self) -> Option<&TopologySnapshot> {
        self.topology.as_deref()
    }

    /// Last applied runtime data snapshot.
    pub fn runtime_data(&self) -> Option<&RuntimeDataSnapshot> {
        self.runtime_data.as_deref()
    }

    /// Every group with its role, primary first.
    pub fn groups(&self) -> impl Iterator<Item = (MasterRole, &MasterGroup)> {
        std::iter::once((MasterRole::Primary, &self.primary))
            .chain(self.secondary.iter().map(|g| (MasterRole::Secondary, g)))
            .chain([
                (MasterRole::Providers, &self.providers),
                (MasterRole::Discovery, &self.discovery),
                (MasterRole::QueueAgent, &self.queue_agents),
            ])
    }
}

/// Rebuilds every group from `topology`.
///
/// Nodes still present keep the runtime state they had in `prev`, including
/// state from older snapshots that the latest one omitted. If `prev` holds
/// runtime data, it is then applied again to the fresh groups.
pub fn apply_topology(prev: &AggregateState, topology: TopologySnapshot) -> AggregateState {
    let topology = Arc::new(topology);

    let known: HashMap<NodeKey, &NodeRecord> = prev
        .groups()
        .flat_map(|(_, group)| group.instances())
        .filter(|node| node.state().is_some())
        .map(|node| (node.key(), node))
        .collect();
    let build = |group: &MastersGroup, role: MasterRole| {
        group::build_from_snapshot(group, role).carried_forward(&known)
    };

    let state = AggregateState {
        primary: build(&topology.primary_master, MasterRole::Primary),
        secondary: topology
            .secondary_masters
            .iter()
            .map(|cell| build(cell, MasterRole::Secondary))
            .collect(),
        providers: build(&topology.timestamp_providers, MasterRole::Providers),
        discovery: build(&topology.discovery_servers, MasterRole::Discovery),
        queue_agents: build(&topology.queue_agents, MasterRole::QueueAgent),
        counters: None,
        alerts: prev.alerts.clone(),
        topology: Some(Arc::clone(&topology)),
        runtime_data: None,
    };

    debug!(
        "Built master groups: {} secondary cells, {} nodes in total",
        state.secondary.len(),
        state.groups().map(|(_, g)| g.instances().len()).sum::<usize>()
    );

    match &prev.runtime_data {
        Some(runtime_data) => refresh(&state, Arc::clone(runtime_data)),
        None => state,
    }
}

/// Applies a runtime data snapshot to the groups of `prev`.
///
/// Nodes without a matching entry keep their previous state; entries that
/// match no node are ignored.
pub fn apply_runtime_data(prev: &AggregateState, runtime_data: RuntimeDataSnapshot) -> AggregateState {
    refresh(prev, Arc::new(runtime_data))
}

/// Replaces the alert list and nothing else.
pub fn set_alerts(prev: &AggregateState, alerts: Vec<MasterAlert>) -> AggregateState {
    AggregateState {
        alerts,
        ..prev.clone()
    }
}

fn refresh(prev: &AggregateState, runtime_data: Arc<RuntimeDataSnapshot>) -> AggregateState {
    if runtime_data.data.len() != runtime_data.master_info.len() {
        warn!(
            "Runtime data has {} results for {} masters, surplus entries are ignored",
            runtime_data.data.len(),
            runtime_data.master_info.len()
        );
    }

    let lookup = build_lookup(&runtime_data);
    let mut matched = 0;

    let mut refresh_group = |group: &MasterGroup, role: MasterRole| {
        let (group, hits) = group.refreshed(&lookup, role.has_quorum());
        matched += hits;
        group
    };

    let primary = refresh_group(&prev.primary, MasterRole::Primary);
    let secondary: Vec<MasterGroup> = prev
        .secondary
        .iter()
        .map(|cell| refresh_group(cell, MasterRole::Secondary))
        .collect();
    let providers = refresh_group(&prev.providers, MasterRole::Providers);
    let discovery = refresh_group(&prev.discovery, MasterRole::Discovery);
    let queue_agents = refresh_group(&prev.queue_agents, MasterRole::QueueAgent);

    let statuses = counters::count_statuses(runtime_data.outputs());
    let counters = counters::extract_counters(&primary, &secondary, statuses);

    debug!(
        "Applied runtime data: {} of {} entries matched a node",
        matched,
        lookup.len()
    );

    AggregateState {
        primary,
        secondary,
        providers,
        discovery,
        queue_agents,
        counters: Some(counters),
        alerts: prev.alerts.clone(),
        topology: prev.topology.clone(),
        runtime_data: Some(runtime_data),
    }
}

fn build_lookup(runtime_data: &RuntimeDataSnapshot) -> HashMap<NodeKey, &MasterDataItem> {
    let mut lookup = HashMap::with_capacity(runtime_data.master_info.len());

    for (info, item) in runtime_data.entries() {
        let Some(key) = info.key() else {
            debug!("Skipping runtime data for {} of unknown type '{}'", info.host, info.kind);
            continue;
        };

        match item {
            Some(item) => {
                lookup.insert(key, item);
            }
            None => debug!("No runtime output for {}", key),
        }
    }

    lookup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeState;
    use crate::quorum::QuorumStatus;
    use crate::snapshot::{BatchResultsItem, MasterAddress, MasterDataItemInfo, MastersGroup};

    fn cell(hosts: &[&str], cell_tag: u32) -> MastersGroup {
        MastersGroup {
            addresses: hosts.iter().map(|host| MasterAddress::new(*host)).collect(),
            cell_tag: Some(cell_tag),
            cell_id: None,
        }
    }

    fn topology() -> TopologySnapshot {
        TopologySnapshot {
            primary_master: cell(&["m2", "m1", "m3"], 1),
            secondary_masters: vec![cell(&["s1", "s2"], 20), cell(&["t1"], 10)],
            timestamp_providers: cell(&["p1"], 1),
            discovery_servers: cell(&["d1"], 1),
            queue_agents: MastersGroup {
                addresses: vec![MasterAddress::new("qa1")],
                ..MastersGroup::default()
            },
        }
    }

    fn entry(
        data: &mut RuntimeDataSnapshot,
        kind: &str,
        cell_tag: Option<u32>,
        host: &str,
        state: &str,
        committed_version: Option<&str>,
    ) {
        data.push(
            MasterDataItemInfo {
                host: host.to_string(),
                kind: kind.to_string(),
                cell_tag,
            },
            BatchResultsItem::ok(MasterDataItem {
                state: Some(NodeState::from(state)),
                committed_version: committed_version.map(str::to_string),
            }),
        );
    }

    fn runtime_data() -> RuntimeDataSnapshot {
        let mut data = RuntimeDataSnapshot::default();
        entry(&mut data, "primary", Some(1), "m1", "leading", Some("1-100"));
        entry(&mut data, "primary", Some(1), "m2", "following", None);
        entry(&mut data, "primary", Some(1), "m3", "stopped", None);
        entry(&mut data, "secondary", Some(20), "s1", "following", None);
        entry(&mut data, "secondary", Some(20), "s2", "leading", Some("20-5"));
        entry(&mut data, "secondary", Some(10), "t1", "elections", None);
        entry(&mut data, "providers", Some(1), "p1", "leading", None);
        entry(&mut data, "discovery", Some(1), "d1", "following", None);
        entry(&mut data, "queue_agent", None, "qa1", "following", None);
        data
    }

    #[test]
    fn test_topology_only() {
        let state = apply_topology(&AggregateState::default(), topology());

        assert_eq!(state.secondary().len(), 2);
        assert_eq!(state.secondary()[0].cell_tag(), Some(20));
        assert_eq!(state.secondary()[1].cell_tag(), Some(10));
        assert!(state.counters().is_none());
        assert!(state.primary().quorum().is_none());
        assert!(state.topology().is_some());
    }

    #[test]
    fn test_runtime_data_classifies_groups() {
        let state = apply_topology(&AggregateState::default(), topology());
        let state = apply_runtime_data(&state, runtime_data());

        let primary = state.primary();
        assert_eq!(primary.quorum().map(|q| q.status), Some(QuorumStatus::WeakQuorum));
        assert_eq!(primary.leader().map(|n| n.host()), Some("m1"));
        assert_eq!(
            primary.quorum().and_then(|q| q.leader_committed_version.as_deref()),
            Some("1-100")
        );
        assert_eq!(
            state.secondary()[0].quorum().map(|q| q.status),
            Some(QuorumStatus::Quorum)
        );
        assert_eq!(
            state.secondary()[1].quorum().map(|q| q.status),
            Some(QuorumStatus::NoQuorum)
        );
        assert_eq!(
            state.providers().quorum().map(|q| q.status),
            Some(QuorumStatus::Quorum)
        );
        assert!(state.discovery().quorum().is_none());
        assert!(state.queue_agents().quorum().is_none());
        assert_eq!(
            state.discovery().instances()[0].state(),
            Some(&NodeState::Following)
        );
        assert_eq!(
            state.queue_agents().instances()[0].state(),
            Some(&NodeState::Following)
        );
    }

    #[test]
    fn test_counters() {
        let state = apply_topology(&AggregateState::default(), topology());
        let state = apply_runtime_data(&state, runtime_data());
        let counters = state.counters().unwrap();

        assert_eq!(counters.total, 3);
        assert_eq!(counters.flags.primary, 1);
        assert_eq!(counters.flags.secondary, 2);
        assert_eq!(counters.flags.recovery, 1);
        assert_eq!(counters.flags.unavailable, 1);
        assert_eq!(counters.statuses.success, 7);
        assert_eq!(counters.states.get(&QuorumStatus::WeakQuorum), Some(&1));
        assert_eq!(counters.states.get(&QuorumStatus::Quorum), Some(&1));
        assert_eq!(counters.states.get(&QuorumStatus::NoQuorum), Some(&1));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let topology_only = apply_topology(&AggregateState::default(), topology());
        let before = topology_only.clone();

        let _ = apply_runtime_data(&topology_only, runtime_data());

        assert_eq!(topology_only, before);
    }

    #[test]
    fn test_set_alerts_keeps_groups() {
        let state = apply_topology(&AggregateState::default(), topology());
        let state = apply_runtime_data(&state, runtime_data());
        let alert = MasterAlert(serde_json::json!({"message": "Unrecognized options"}));

        let with_alerts = set_alerts(&state, vec![alert.clone()]);

        assert_eq!(with_alerts.alerts(), &[alert]);
        assert_eq!(with_alerts.primary(), state.primary());
        assert_eq!(with_alerts.counters(), state.counters());

        let rebuilt = apply_topology(&with_alerts, topology());
        assert_eq!(rebuilt.alerts().len(), 1);
    }

    #[test]
    fn test_serializes_leader_host() {
        let state = apply_topology(&AggregateState::default(), topology());
        let state = apply_runtime_data(&state, runtime_data());

        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["primary"]["leader"], "m1");
        assert_eq!(json["primary"]["quorum"]["status"], "weak-quorum");
        assert_eq!(json["counters"]["states"]["no-quorum"], 1);
        assert_eq!(json["queueAgents"]["instances"][0]["host"], "qa1");
    }
}
