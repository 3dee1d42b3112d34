//! Master quorum aggregation for the cluster dashboard
//!
//! This crate provides:
//! - Node records and replicated master groups
//! - Quorum classification and per-state counters
//! - Reconciliation of independently fetched topology and runtime data
//! - A monitor that keeps the aggregate of one cluster up to date
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod counters;
pub mod error;
pub mod group;
pub mod monitor;
pub mod node;
pub mod quorum;
pub mod reconciler;
pub mod snapshot;
pub mod source;
pub mod store;

pub use config::MastersMonitorConfig;
pub use counters::{CounterFlags, MasterCounters, StatusCounts};
pub use error::{MastersError, MastersSourceError, SourceErrorKind};
pub use group::MasterGroup;
pub use monitor::MastersMonitor;
pub use node::{CellTag, MasterRole, NodeKey, NodeRecord, NodeState, Presence};
pub use quorum::{Quorum, QuorumStatus};
pub use reconciler::AggregateState;
pub use snapshot::{
    MasterAlert, MasterDataItem, MasterDataItemInfo, RuntimeDataSnapshot, TopologySnapshot,
};
pub use source::MastersSource;
pub use store::{MastersAction, MastersState};
