//! Wire shapes of the topology snapshot, the runtime-data snapshot and master alerts.
//!
//! Field names follow the JSON produced by the dashboard's fetch layer. Every
//! optional field defaults, so partially populated snapshots still decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MastersError;
use crate::node::{CellTag, MasterRole, NodeKey, NodeState, Presence};

/// Attributes attached to a master address.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressAttributes {
    /// Cell tag the node natively belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_cell_tag: Option<CellTag>,

    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

/// One configured address of a master group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAddress {
    /// Host address, `host:port`.
    pub host: String,

    /// Physical machine behind the address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_host: Option<String>,

    /// Address attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AddressAttributes>,

    /// Presence reported by the topology source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Presence>,
}

impl MasterAddress {
    /// Address with only a host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Native cell tag from the address attributes.
    pub fn native_cell_tag(&self) -> Option<CellTag> {
        self.attributes.as_ref().and_then(|a| a.native_cell_tag)
    }
}

/// Configured membership of one master group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MastersGroup {
    /// Member addresses, in whatever order the source returned them.
    #[serde(default)]
    pub addresses: Vec<MasterAddress>,

    /// Cell tag of the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_tag: Option<CellTag>,

    /// Cell id of the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<String>,
}

/// Topology ("config") snapshot: which nodes make up which group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySnapshot {
    /// Primary master cell.
    #[serde(default)]
    pub primary_master: MastersGroup,

    /// Secondary master cells, in cluster order.
    #[serde(default)]
    pub secondary_masters: Vec<MastersGroup>,

    /// Discovery servers.
    #[serde(default)]
    pub discovery_servers: MastersGroup,

    /// Queue agents.
    #[serde(default)]
    pub queue_agents: MastersGroup,

    /// Timestamp providers.
    #[serde(default)]
    pub timestamp_providers: MastersGroup,
}

impl TopologySnapshot {
    /// Decodes a topology snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MastersError::Decode`] if the JSON does not match the snapshot shape.
    pub fn from_json(json: &str) -> Result<Self, MastersError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Runtime output of a single node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterDataItem {
    /// Reported consensus state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NodeState>,

    /// Committed version, meaningful for the leader.
    #[serde(
        default,
        alias = "committedVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub committed_version: Option<String>,
}

impl MasterDataItem {
    /// Item with only a state.
    pub fn with_state(state: impl Into<NodeState>) -> Self {
        Self {
            state: Some(state.into()),
            committed_version: None,
        }
    }
}

/// One result of a batch request: an output or an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchResultsItem<T> {
    /// Decoded output, absent when the sub-request failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<T>,

    /// Error of the sub-request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl<T> BatchResultsItem<T> {
    /// Successful item.
    pub const fn ok(output: T) -> Self {
        Self {
            output: Some(output),
            error: None,
        }
    }

    /// Failed item.
    pub const fn failed(error: Value) -> Self {
        Self {
            output: None,
            error: Some(error),
        }
    }
}

/// Identifies which node a positional runtime data entry belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterDataItemInfo {
    /// Host address.
    pub host: String,

    /// Role wire name, e.g. `primary` or `queue_agent`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Cell tag, absent for queue agents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_tag: Option<CellTag>,
}

impl MasterDataItemInfo {
    /// Join key of this entry, `None` when the role is not recognized.
    pub fn key(&self) -> Option<NodeKey> {
        let role: MasterRole = self.kind.parse().ok()?;
        Some(NodeKey::new(role, self.cell_tag, self.host.clone()))
    }
}

/// Runtime ("data") snapshot; `data[i]` belongs to `master_info[i]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDataSnapshot {
    /// Positional batch results.
    #[serde(default)]
    pub data: Vec<BatchResultsItem<MasterDataItem>>,

    /// Positional node identities.
    #[serde(default)]
    pub master_info: Vec<MasterDataItemInfo>,
}

impl RuntimeDataSnapshot {
    /// Decodes a runtime data snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MastersError::Decode`] if the JSON does not match the snapshot shape.
    pub fn from_json(json: &str) -> Result<Self, MastersError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Appends one entry, keeping `data` and `master_info` aligned.
    pub fn push(&mut self, info: MasterDataItemInfo, item: BatchResultsItem<MasterDataItem>) {
        self.master_info.push(info);
        self.data.push(item);
    }

    /// Pairs each identity with its output, if any. Surplus entries on either side are skipped.
    pub fn entries(&self) -> impl Iterator<Item = (&MasterDataItemInfo, Option<&MasterDataItem>)> {
        self.master_info
            .iter()
            .zip(self.data.iter().map(|item| item.output.as_ref()))
    }

    /// Every output in the snapshot, whether or not it can be joined.
    pub fn outputs(&self) -> impl Iterator<Item = &MasterDataItem> {
        self.data.iter().filter_map(|item| item.output.as_ref())
    }
}

/// An opaque alert raised by the masters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterAlert(pub Value);

impl MasterAlert {
    /// Top-level error message of the alert, if it has one.
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }
}

/// Decodes an alert list from JSON.
///
/// # Errors
///
/// Returns [`MastersError::Decode`] if the JSON is not an array.
pub fn decode_alerts(json: &str) -> Result<Vec<MasterAlert>, MastersError> {
    Ok(serde_json::from_str(json)?)
}
