//! Quorum classification of a replicated master group

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{NodeRecord, NodeState};

/// Quorum health of a group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuorumStatus {
    /// A leader exists and every reporting node is healthy.
    Quorum,

    /// A leader exists but some reporting node is not.
    WeakQuorum,

    /// No node reports `leading`.
    NoQuorum,
}

impl QuorumStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quorum => "quorum",
            Self::WeakQuorum => "weak-quorum",
            Self::NoQuorum => "no-quorum",
        }
    }
}

impl fmt::Display for QuorumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result for one group.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quorum {
    /// Quorum health.
    pub status: QuorumStatus,

    /// Committed version of the leading node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_committed_version: Option<String>,
}

/// Classifies the quorum health of a group from its nodes' runtime states.
///
/// Nodes without a runtime state are left out entirely. Any other state that
/// is not `following` or `leading` marks the group as degraded. Should several
/// nodes claim `leading`, the committed version of the last one is reported.
pub fn classify<'a, I>(nodes: I) -> Quorum
where
    I: IntoIterator<Item = &'a NodeRecord>,
{
    let mut exists_problematic = false;
    let mut exists_leading = false;
    let mut leader_committed_version = None;

    for node in nodes {
        let Some(state) = node.state() else {
            continue;
        };

        if !state.is_healthy() {
            exists_problematic = true;
        }

        if *state == NodeState::Leading {
            exists_leading = true;
            leader_committed_version = node.committed_version().map(str::to_string);
        }
    }

    let status = match (exists_leading, exists_problematic) {
        (true, false) => QuorumStatus::Quorum,
        (true, true) => QuorumStatus::WeakQuorum,
        (false, _) => QuorumStatus::NoQuorum,
    };

    Quorum {
        status,
        leader_committed_version,
    }
}

/// Position of the first node reporting `leading`.
pub fn find_leader(nodes: &[NodeRecord]) -> Option<usize> {
    nodes.iter().position(NodeRecord::is_leading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MasterRole;
    use crate::snapshot::MasterDataItem;

    fn node(host: &str, state: Option<&str>, committed_version: Option<&str>) -> NodeRecord {
        let record = NodeRecord::new(host, MasterRole::Primary, Some(1));
        match state {
            Some(state) => record.updated(&MasterDataItem {
                state: Some(NodeState::from(state)),
                committed_version: committed_version.map(str::to_string),
            }),
            None => record,
        }
    }

    #[test]
    fn test_empty_group_has_no_quorum() {
        let quorum = classify(&[]);

        assert_eq!(quorum.status, QuorumStatus::NoQuorum);
        assert_eq!(quorum.leader_committed_version, None);
        assert_eq!(find_leader(&[]), None);
    }

    #[test]
    fn test_single_leader_has_quorum() {
        let nodes = vec![node("m1", Some("leading"), Some("v1"))];
        let quorum = classify(&nodes);

        assert_eq!(quorum.status, QuorumStatus::Quorum);
        assert_eq!(quorum.leader_committed_version.as_deref(), Some("v1"));
        assert_eq!(find_leader(&nodes), Some(0));
    }

    #[test]
    fn test_stopped_follower_weakens_quorum() {
        let nodes = vec![
            node("m1", Some("leading"), Some("v1")),
            node("m2", Some("stopped"), None),
        ];

        assert_eq!(classify(&nodes).status, QuorumStatus::WeakQuorum);
    }

    #[test]
    fn test_followers_without_leader_have_no_quorum() {
        let nodes = vec![node("m1", Some("following"), None)];

        assert_eq!(classify(&nodes).status, QuorumStatus::NoQuorum);
        assert_eq!(find_leader(&nodes), None);
    }

    #[test]
    fn test_stateless_nodes_are_ignored() {
        let nodes = vec![
            node("m1", Some("leading"), Some("v1")),
            node("m2", None, None),
            node("m3", Some("following"), None),
        ];

        assert_eq!(classify(&nodes).status, QuorumStatus::Quorum);
    }

    #[test]
    fn test_recovery_and_unrecognized_states_are_problematic() {
        let recovering = vec![
            node("m1", Some("leading"), None),
            node("m2", Some("follower_recovery"), None),
        ];
        let odd = vec![
            node("m1", Some("leading"), None),
            node("m2", Some("read_only"), None),
        ];

        assert_eq!(classify(&recovering).status, QuorumStatus::WeakQuorum);
        assert_eq!(classify(&odd).status, QuorumStatus::WeakQuorum);
    }

    #[test]
    fn test_last_leader_version_wins_first_leader_is_reported() {
        let nodes = vec![
            node("m1", Some("leading"), Some("v1")),
            node("m2", Some("leading"), Some("v2")),
        ];

        assert_eq!(
            classify(&nodes).leader_committed_version.as_deref(),
            Some("v2")
        );
        assert_eq!(find_leader(&nodes), Some(0));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&QuorumStatus::WeakQuorum).unwrap(),
            "\"weak-quorum\""
        );
        assert_eq!(QuorumStatus::NoQuorum.to_string(), "no-quorum");
    }
}
