//! Control-plane node records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::snapshot::MasterDataItem;

/// Numeric cell tag of a master cell.
pub type CellTag = u32;

/// The replicated group a node belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterRole {
    /// Primary master cell.
    Primary,

    /// One of the secondary master cells.
    Secondary,

    /// Timestamp providers.
    Providers,

    /// Discovery servers.
    Discovery,

    /// Queue agents.
    QueueAgent,
}

impl MasterRole {
    /// Wire name of the role, as reported in runtime data `type` fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Providers => "providers",
            Self::Discovery => "discovery",
            Self::QueueAgent => "queue_agent",
        }
    }

    /// Whether groups of this role elect a leader and report quorum health.
    #[must_use]
    pub const fn has_quorum(self) -> bool {
        matches!(self, Self::Primary | Self::Secondary | Self::Providers)
    }
}

impl fmt::Display for MasterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasterRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "providers" => Ok(Self::Providers),
            "discovery" => Ok(Self::Discovery),
            "queue_agent" => Ok(Self::QueueAgent),
            other => Err(format!("unknown master role '{other}'")),
        }
    }
}

/// Consensus state reported by a running node.
///
/// Values outside the known set decode into [`NodeState::Unrecognized`] so a
/// single odd node never fails the whole snapshot.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeState {
    /// Node is stopped.
    Stopped,

    /// Node state could not be determined by the node itself.
    Unknown,

    /// Leader election in progress.
    Elections,

    /// Follower catching up.
    FollowerRecovery,

    /// Leader recovering.
    LeaderRecovery,

    /// Healthy follower.
    Following,

    /// Healthy leader.
    Leading,

    /// Any state string outside the known set.
    Unrecognized(String),
}

impl NodeState {
    /// Wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
            Self::Elections => "elections",
            Self::FollowerRecovery => "follower_recovery",
            Self::LeaderRecovery => "leader_recovery",
            Self::Following => "following",
            Self::Leading => "leading",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// `following` or `leading`.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Following | Self::Leading)
    }
}

impl From<String> for NodeState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "stopped" => Self::Stopped,
            "unknown" => Self::Unknown,
            "elections" => Self::Elections,
            "follower_recovery" => Self::FollowerRecovery,
            "leader_recovery" => Self::LeaderRecovery,
            "following" => Self::Following,
            "leading" => Self::Leading,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<&str> for NodeState {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        match state {
            NodeState::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reachability of an address as reported by the topology source.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Address is online.
    Online,

    /// Address is offline.
    Offline,

    /// Not known.
    Unknown,
}

/// Join key between topology nodes and runtime data entries.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeKey {
    /// Role of the node.
    pub role: MasterRole,
    /// Cell tag, absent for queue agents.
    pub cell_tag: Option<CellTag>,
    /// Host address.
    pub host: String,
}

impl NodeKey {
    /// Builds a key from its parts.
    pub fn new(role: MasterRole, cell_tag: Option<CellTag>, host: impl Into<String>) -> Self {
        Self {
            role,
            cell_tag,
            host: host.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell_tag {
            Some(cell_tag) => write!(f, "{}/{}/{}", self.role, cell_tag, self.host),
            None => write!(f, "{}/-/{}", self.role, self.host),
        }
    }
}

/// One control-plane node: identity from topology plus the last known runtime state.
///
/// Identity never changes after construction. Runtime fields only change
/// through [`NodeRecord::updated`], which returns a new record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    host: String,
    role: MasterRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    cell_tag: Option<CellTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cell_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    physical_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence: Option<Presence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<NodeState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    committed_version: Option<String>,
}

impl NodeRecord {
    /// Creates a topology-only record with no runtime state.
    ///
    /// Queue agents never carry a cell tag; one passed here is dropped.
    pub fn new(host: impl Into<String>, role: MasterRole, cell_tag: Option<CellTag>) -> Self {
        Self {
            host: host.into(),
            role,
            cell_tag: if role == MasterRole::QueueAgent {
                None
            } else {
                cell_tag
            },
            cell_id: None,
            physical_host: None,
            presence: None,
            state: None,
            committed_version: None,
        }
    }

    /// Sets the cell id.
    #[must_use]
    pub fn with_cell_id(mut self, cell_id: Option<String>) -> Self {
        self.cell_id = cell_id;
        self
    }

    /// Sets the physical host.
    #[must_use]
    pub fn with_physical_host(mut self, physical_host: Option<String>) -> Self {
        self.physical_host = physical_host;
        self
    }

    /// Sets the reported presence.
    #[must_use]
    pub fn with_presence(mut self, presence: Option<Presence>) -> Self {
        self.presence = presence;
        self
    }

    /// Host address of this node.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Role of this node.
    pub const fn role(&self) -> MasterRole {
        self.role
    }

    /// Cell tag of this node.
    pub const fn cell_tag(&self) -> Option<CellTag> {
        self.cell_tag
    }

    /// Cell id of this node.
    pub fn cell_id(&self) -> Option<&str> {
        self.cell_id.as_deref()
    }

    /// Physical host behind the address, if reported.
    pub fn physical_host(&self) -> Option<&str> {
        self.physical_host.as_deref()
    }

    /// Presence reported by the topology source.
    pub const fn presence(&self) -> Option<Presence> {
        self.presence
    }

    /// Last known runtime state, `None` until runtime data matched this node.
    pub const fn state(&self) -> Option<&NodeState> {
        self.state.as_ref()
    }

    /// Committed version reported alongside the state.
    pub fn committed_version(&self) -> Option<&str> {
        self.committed_version.as_deref()
    }

    /// Whether this node currently reports `leading`.
    pub fn is_leading(&self) -> bool {
        self.state == Some(NodeState::Leading)
    }

    /// Key used to join this node with runtime data.
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.role, self.cell_tag, self.host.clone())
    }

    /// Derives a new record carrying the runtime state from `item`.
    ///
    /// An item without a state leaves the record as it was.
    #[must_use]
    pub fn updated(&self, item: &MasterDataItem) -> Self {
        let Some(state) = &item.state else {
            return self.clone();
        };

        Self {
            state: Some(state.clone()),
            committed_version: item.committed_version.clone(),
            ..self.clone()
        }
    }

    /// Derives a new record carrying the runtime state of `known`.
    ///
    /// Topology fields stay as they are in `self`.
    #[must_use]
    pub fn with_runtime_of(&self, known: &Self) -> Self {
        Self {
            state: known.state.clone(),
            committed_version: known.committed_version.clone(),
            ..self.clone()
        }
    }
}
