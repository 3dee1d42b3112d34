//! Fetch status around the masters aggregate

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::MastersError;
use crate::reconciler::{self, AggregateState};
use crate::snapshot::{MasterAlert, RuntimeDataSnapshot, TopologySnapshot};

/// Events that change the masters state.
#[derive(Clone, Debug)]
pub enum MastersAction {
    /// A topology fetch started.
    FetchConfigRequest,

    /// A topology fetch completed.
    FetchConfigSuccess(TopologySnapshot),

    /// A topology fetch failed.
    FetchConfigFailure(MastersError),

    /// A runtime data fetch started.
    FetchDataRequest,

    /// A runtime data fetch completed.
    FetchDataSuccess(RuntimeDataSnapshot),

    /// A runtime data fetch failed.
    FetchDataFailure(MastersError),

    /// New alert list.
    SetAlerts(Vec<MasterAlert>),

    /// The dashboard switched to another cluster.
    ClusterChanged(String),
}

/// The aggregate plus the status of the fetches feeding it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MastersState {
    cluster: Option<String>,
    fetching_config: bool,
    fetching_data: bool,
    #[serde(serialize_with = "serialize_error")]
    error: Option<MastersError>,
    initialized: bool,
    aggregate: Arc<AggregateState>,
}

impl MastersState {
    /// Empty state for `cluster`.
    pub fn for_cluster(cluster: impl Into<String>) -> Self {
        Self {
            cluster: Some(cluster.into()),
            ..Self::default()
        }
    }

    /// Cluster this state belongs to.
    pub fn cluster(&self) -> Option<&str> {
        self.cluster.as_deref()
    }

    /// A topology fetch is in flight.
    pub const fn fetching_config(&self) -> bool {
        self.fetching_config
    }

    /// A runtime data fetch is in flight.
    pub const fn fetching_data(&self) -> bool {
        self.fetching_data
    }

    /// Last fetch error.
    pub const fn error(&self) -> Option<&MastersError> {
        self.error.as_ref()
    }

    /// A topology snapshot has been applied at least once.
    pub const fn initialized(&self) -> bool {
        self.initialized
    }

    /// Current aggregate.
    pub fn aggregate(&self) -> &AggregateState {
        &self.aggregate
    }

    /// Reduces `action` into a new state; `self` is left as it was.
    ///
    /// Failures only record the error. The last good aggregate stays in place.
    /// A successful fetch clears the recorded error.
    #[must_use]
    pub fn reduce(&self, action: MastersAction) -> Self {
        match action {
            MastersAction::FetchConfigRequest => Self {
                fetching_config: true,
                ..self.clone()
            },
            MastersAction::FetchConfigSuccess(topology) => Self {
                aggregate: Arc::new(reconciler::apply_topology(&self.aggregate, topology)),
                fetching_config: false,
                initialized: true,
                error: None,
                ..self.clone()
            },
            MastersAction::FetchConfigFailure(error) => {
                warn!("Masters topology fetch failed: {}", error);
                Self {
                    fetching_config: false,
                    error: Some(error),
                    ..self.clone()
                }
            }
            MastersAction::FetchDataRequest => Self {
                fetching_data: true,
                ..self.clone()
            },
            MastersAction::FetchDataSuccess(runtime_data) => Self {
                aggregate: Arc::new(reconciler::apply_runtime_data(&self.aggregate, runtime_data)),
                fetching_data: false,
                error: None,
                ..self.clone()
            },
            MastersAction::FetchDataFailure(error) => {
                warn!("Masters runtime data fetch failed: {}", error);
                Self {
                    fetching_data: false,
                    error: Some(error),
                    ..self.clone()
                }
            }
            MastersAction::SetAlerts(alerts) => Self {
                aggregate: Arc::new(reconciler::set_alerts(&self.aggregate, alerts)),
                ..self.clone()
            },
            MastersAction::ClusterChanged(cluster) => {
                if self.cluster.as_deref() == Some(cluster.as_str()) {
                    debug!("Cluster {} already selected", cluster);
                    self.clone()
                } else {
                    info!("Switching masters state to cluster {}", cluster);
                    Self::for_cluster(cluster)
                }
            }
        }
    }
}

#[allow(clippy::ref_option)]
fn serialize_error<S: serde::Serializer>(
    error: &Option<MastersError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
