//! Replicated master groups and their construction from topology

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::warn;

use crate::node::{CellTag, MasterRole, NodeKey, NodeRecord};
use crate::quorum::{self, Quorum};
use crate::snapshot::{MasterAddress, MasterDataItem, MastersGroup};

/// One replicated group: the primary cell, a secondary cell, providers,
/// discovery servers or queue agents.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MasterGroup {
    instances: Vec<NodeRecord>,
    cell_tag: Option<CellTag>,
    cell_id: Option<String>,
    quorum: Option<Quorum>,
    leader: Option<usize>,
}

impl MasterGroup {
    /// Nodes of the group, sorted by host.
    pub fn instances(&self) -> &[NodeRecord] {
        &self.instances
    }

    /// Cell tag of the group.
    pub const fn cell_tag(&self) -> Option<CellTag> {
        self.cell_tag
    }

    /// Cell id of the group.
    pub fn cell_id(&self) -> Option<&str> {
        self.cell_id.as_deref()
    }

    /// Quorum health, `None` until runtime data has been applied.
    pub const fn quorum(&self) -> Option<&Quorum> {
        self.quorum.as_ref()
    }

    /// The node currently reporting `leading`.
    pub fn leader(&self) -> Option<&NodeRecord> {
        self.leader.and_then(|index| self.instances.get(index))
    }

    /// Whether the group has no nodes.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Derives the group with runtime data applied to every node found in `lookup`.
    ///
    /// Nodes with no entry keep their previous state. Quorum and leader are
    /// recomputed when `classify` is set and left untouched otherwise.
    pub(crate) fn refreshed(
        &self,
        lookup: &HashMap<NodeKey, &MasterDataItem>,
        classify: bool,
    ) -> (Self, usize) {
        let mut matched = 0;

        let mut instances: Vec<NodeRecord> = self
            .instances
            .iter()
            .map(|node| match lookup.get(&node.key()) {
                Some(item) => {
                    matched += 1;
                    node.updated(item)
                }
                None => node.clone(),
            })
            .collect();
        instances.sort_by(|a, b| a.host().cmp(b.host()));

        let (quorum, leader) = if classify {
            (
                Some(quorum::classify(&instances)),
                quorum::find_leader(&instances),
            )
        } else {
            (self.quorum.clone(), self.leader)
        };

        let group = Self {
            instances,
            cell_tag: self.cell_tag,
            cell_id: self.cell_id.clone(),
            quorum,
            leader,
        };

        (group, matched)
    }

    /// Derives the group with the runtime state of every node found in `known`.
    ///
    /// Quorum and leader are left for the next classification.
    pub(crate) fn carried_forward(&self, known: &HashMap<NodeKey, &NodeRecord>) -> Self {
        Self {
            instances: self
                .instances
                .iter()
                .map(|node| match known.get(&node.key()) {
                    Some(known) => node.with_runtime_of(known),
                    None => node.clone(),
                })
                .collect(),
            ..self.clone()
        }
    }
}

impl Serialize for MasterGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MasterGroup", 5)?;
        state.serialize_field("instances", &self.instances)?;
        state.serialize_field("cellTag", &self.cell_tag)?;
        state.serialize_field("cellId", &self.cell_id)?;
        state.serialize_field("quorum", &self.quorum)?;
        state.serialize_field("leader", &self.leader().map(NodeRecord::host))?;
        state.end()
    }
}

/// Builds a group from configured addresses, sorted by host.
///
/// Each node takes the group's cell tag, or its own native cell tag when the
/// group has none. If a host appears more than once, the last entry wins.
pub fn build_group(
    addresses: &[MasterAddress],
    role: MasterRole,
    cell_tag: Option<CellTag>,
    cell_id: Option<&str>,
) -> MasterGroup {
    let mut by_host: HashMap<&str, &MasterAddress> = HashMap::with_capacity(addresses.len());
    for address in addresses {
        if by_host.insert(address.host.as_str(), address).is_some() {
            warn!(
                "Duplicate {} host {} in topology, keeping the last entry",
                role, address.host
            );
        }
    }

    let mut sorted: Vec<&MasterAddress> = by_host.into_values().collect();
    sorted.sort_by(|a, b| a.host.cmp(&b.host));

    let instances = sorted
        .into_iter()
        .map(|address| {
            NodeRecord::new(
                address.host.clone(),
                role,
                cell_tag.or_else(|| address.native_cell_tag()),
            )
            .with_cell_id(cell_id.map(str::to_string))
            .with_physical_host(address.physical_host.clone())
            .with_presence(address.state)
        })
        .collect();

    MasterGroup {
        instances,
        cell_tag: if role == MasterRole::QueueAgent {
            None
        } else {
            cell_tag
        },
        cell_id: cell_id.map(str::to_string),
        quorum: None,
        leader: None,
    }
}

/// Builds a group from its topology snapshot entry.
pub fn build_from_snapshot(group: &MastersGroup, role: MasterRole) -> MasterGroup {
    build_group(
        &group.addresses,
        role,
        group.cell_tag,
        group.cell_id.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeState;
    use crate::snapshot::AddressAttributes;

    fn addresses(hosts: &[&str]) -> Vec<MasterAddress> {
        hosts.iter().map(|host| MasterAddress::new(*host)).collect()
    }

    fn hosts(group: &MasterGroup) -> Vec<&str> {
        group.instances().iter().map(NodeRecord::host).collect()
    }

    #[test]
    fn test_build_sorts_by_host() {
        let group = build_group(
            &addresses(&["m3:9010", "m1:9010", "m2:9010"]),
            MasterRole::Primary,
            Some(1),
            Some("cell-1"),
        );

        assert_eq!(hosts(&group), vec!["m1:9010", "m2:9010", "m3:9010"]);
        assert_eq!(group.cell_tag(), Some(1));
        assert_eq!(group.cell_id(), Some("cell-1"));
        assert!(group.quorum().is_none());
        assert!(group.leader().is_none());
        for node in group.instances() {
            assert_eq!(node.state(), None);
            assert_eq!(node.cell_tag(), Some(1));
            assert_eq!(node.cell_id(), Some("cell-1"));
        }
    }

    #[test]
    fn test_build_empty_group() {
        let group = build_group(&[], MasterRole::QueueAgent, None, None);

        assert!(group.is_empty());
    }

    #[test]
    fn test_build_falls_back_to_native_cell_tag() {
        let mut address = MasterAddress::new("d1:9020");
        address.attributes = Some(AddressAttributes {
            native_cell_tag: Some(5),
            annotations: None,
        });

        let group = build_group(&[address], MasterRole::Discovery, None, None);

        assert_eq!(group.instances()[0].cell_tag(), Some(5));
    }

    #[test]
    fn test_build_deduplicates_hosts() {
        let mut first = MasterAddress::new("m1:9010");
        first.physical_host = Some("old".to_string());
        let mut second = MasterAddress::new("m1:9010");
        second.physical_host = Some("new".to_string());

        let group = build_group(&[first, second], MasterRole::Primary, Some(1), None);

        assert_eq!(group.instances().len(), 1);
        assert_eq!(group.instances()[0].physical_host(), Some("new"));
    }

    #[test]
    fn test_refresh_keeps_unmatched_nodes() {
        let group = build_group(
            &addresses(&["m1", "m2"]),
            MasterRole::Secondary,
            Some(3),
            None,
        );
        let leading = MasterDataItem {
            state: Some(NodeState::Leading),
            committed_version: Some("7".to_string()),
        };
        let lookup = HashMap::from([(NodeKey::new(MasterRole::Secondary, Some(3), "m2"), &leading)]);

        let (refreshed, matched) = group.refreshed(&lookup, true);

        assert_eq!(matched, 1);
        assert_eq!(refreshed.instances()[0].state(), None);
        assert_eq!(refreshed.leader().map(NodeRecord::host), Some("m2"));
        assert_eq!(
            refreshed.quorum().and_then(|q| q.leader_committed_version.as_deref()),
            Some("7")
        );
        assert!(group.quorum().is_none());
    }

    #[test]
    fn test_refresh_without_classification() {
        let group = build_group(&addresses(&["d1"]), MasterRole::Discovery, None, None);
        let following = MasterDataItem::with_state("following");
        let lookup = HashMap::from([(NodeKey::new(MasterRole::Discovery, None, "d1"), &following)]);

        let (refreshed, _) = group.refreshed(&lookup, false);

        assert_eq!(
            refreshed.instances()[0].state(),
            Some(&NodeState::Following)
        );
        assert!(refreshed.quorum().is_none());
        assert!(refreshed.leader().is_none());
    }
}
