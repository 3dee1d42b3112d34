//! Per-state counters shown in the masters summary

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::group::MasterGroup;
use crate::node::NodeState;
use crate::quorum::QuorumStatus;
use crate::snapshot::MasterDataItem;

/// Node counts by health bucket.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StatusCounts {
    /// `following` or `leading`.
    pub success: usize,

    /// `elections`, `follower_recovery` or `leader_recovery`.
    pub recovery: usize,

    /// `stopped` or `unknown`.
    pub unavailable: usize,
}

/// Summary flags for the masters header.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CounterFlags {
    /// Nodes in recovery, copied from [`StatusCounts::recovery`].
    pub recovery: usize,

    /// Unavailable nodes, copied from [`StatusCounts::unavailable`].
    pub unavailable: usize,

    /// Number of primary cells, always one.
    pub primary: usize,

    /// Number of secondary cells.
    pub secondary: usize,
}

/// Derived counters of an aggregate.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MasterCounters {
    /// Master cells: secondaries plus the primary.
    pub total: usize,

    /// Summary flags.
    pub flags: CounterFlags,

    /// Cells per quorum status, over the primary and the secondaries.
    ///
    /// Raw per-node status counts are in [`MasterCounters::statuses`].
    pub states: BTreeMap<QuorumStatus, usize>,

    /// Raw per-node status counts the flags were taken from.
    pub statuses: StatusCounts,
}

/// Counts runtime data records by health bucket.
///
/// Records without a state are skipped. Unrecognized states belong to no
/// bucket and are skipped too.
pub fn count_statuses<'a, I>(records: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a MasterDataItem>,
{
    let mut counts = StatusCounts::default();

    for state in records.into_iter().filter_map(|record| record.state.as_ref()) {
        match state {
            NodeState::Stopped | NodeState::Unknown => counts.unavailable += 1,
            NodeState::Elections | NodeState::FollowerRecovery | NodeState::LeaderRecovery => {
                counts.recovery += 1;
            }
            NodeState::Following | NodeState::Leading => counts.success += 1,
            NodeState::Unrecognized(raw) => trace!("Not counting unrecognized state '{}'", raw),
        }
    }

    counts
}

/// Builds the summary counters from classified groups and raw status counts.
///
/// Groups that have not been classified yet are counted in `total` but not in `states`.
pub fn extract_counters(
    primary: &MasterGroup,
    secondary: &[MasterGroup],
    statuses: StatusCounts,
) -> MasterCounters {
    let mut states = BTreeMap::new();

    for group in std::iter::once(primary).chain(secondary) {
        if let Some(quorum) = group.quorum() {
            *states.entry(quorum.status).or_insert(0) += 1;
        }
    }

    MasterCounters {
        total: secondary.len() + 1,
        flags: CounterFlags {
            recovery: statuses.recovery,
            unavailable: statuses.unavailable,
            primary: 1,
            secondary: secondary.len(),
        },
        states,
        statuses,
    }
}
