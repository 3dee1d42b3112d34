//! Keeps the masters state of one cluster up to date from a [`MastersSource`]

use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::{RwLock, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MastersMonitorConfig;
use crate::error::MastersError;
use crate::source::MastersSource;
use crate::store::{MastersAction, MastersState};

/// Background refresh task handles
#[derive(Default)]
struct BackgroundState {
    refresh_task: Option<JoinHandle<()>>,
    shutdown_signal: Option<oneshot::Sender<()>>,
}

/// Owns the masters state of one cluster and applies every fetch result to it.
///
/// All reductions go through a single write guard, so topology and runtime
/// data refreshes may run concurrently and land in arrival order. Readers get
/// immutable snapshots via [`MastersMonitor::state`] or [`MastersMonitor::subscribe`].
pub struct MastersMonitor<S>
where
    S: MastersSource,
{
    source: Arc<S>,
    state: Arc<RwLock<Arc<MastersState>>>,
    publisher: Arc<watch::Sender<Arc<MastersState>>>,
    background: Arc<RwLock<BackgroundState>>,
    config: MastersMonitorConfig,
}

impl<S> MastersMonitor<S>
where
    S: MastersSource,
{
    /// Create a new monitor with default configuration
    pub fn new(cluster: impl Into<String>, source: Arc<S>) -> Self {
        Self::with_config(cluster, source, MastersMonitorConfig::default())
    }

    /// Create a new monitor with custom configuration
    pub fn with_config(
        cluster: impl Into<String>,
        source: Arc<S>,
        config: MastersMonitorConfig,
    ) -> Self {
        let initial = Arc::new(MastersState::for_cluster(cluster));

        info!(
            "Creating masters monitor for cluster {} with data refresh interval {:?}",
            initial.cluster().unwrap_or_default(),
            config.runtime_data_refresh_interval
        );

        let (publisher, _) = watch::channel(Arc::clone(&initial));

        Self {
            source,
            state: Arc::new(RwLock::new(initial)),
            publisher: Arc::new(publisher),
            background: Arc::new(RwLock::new(BackgroundState::default())),
            config,
        }
    }

    /// Current state snapshot
    pub async fn state(&self) -> Arc<MastersState> {
        Arc::clone(&*self.state.read().await)
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<MastersState>> {
        self.publisher.subscribe()
    }

    /// Get source reference
    pub const fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Applies one action under the write guard and publishes the result.
    pub async fn dispatch(&self, action: MastersAction) -> Arc<MastersState> {
        let mut state = self.state.write().await;
        let next = Arc::new(state.reduce(action));
        *state = Arc::clone(&next);
        self.publisher.send_replace(Arc::clone(&next));
        next
    }

    /// Fetch and apply a topology snapshot
    ///
    /// # Errors
    ///
    /// Returns the source error; it is also recorded in the state.
    pub async fn refresh_topology(&self) -> Result<(), MastersError> {
        debug!("Refreshing masters topology");
        self.dispatch(MastersAction::FetchConfigRequest).await;

        match self.source.fetch_topology().await {
            Ok(topology) => {
                debug!(
                    "Source returned topology with {} secondary cells",
                    topology.secondary_masters.len()
                );
                self.dispatch(MastersAction::FetchConfigSuccess(topology))
                    .await;
                Ok(())
            }
            Err(e) => {
                let error = MastersError::from_source(&e);
                self.dispatch(MastersAction::FetchConfigFailure(error.clone()))
                    .await;
                Err(error)
            }
        }
    }

    /// Fetch and apply a runtime data snapshot
    ///
    /// # Errors
    ///
    /// Returns the source error; it is also recorded in the state.
    pub async fn refresh_runtime_data(&self) -> Result<(), MastersError> {
        debug!("Refreshing masters runtime data");
        self.dispatch(MastersAction::FetchDataRequest).await;

        match self.source.fetch_runtime_data().await {
            Ok(runtime_data) => {
                debug!(
                    "Source returned runtime data for {} masters",
                    runtime_data.master_info.len()
                );
                self.dispatch(MastersAction::FetchDataSuccess(runtime_data))
                    .await;
                Ok(())
            }
            Err(e) => {
                let error = MastersError::from_source(&e);
                self.dispatch(MastersAction::FetchDataFailure(error.clone()))
                    .await;
                Err(error)
            }
        }
    }

    /// Fetch and apply the alert list
    ///
    /// # Errors
    ///
    /// Returns the source error. Alert failures are not recorded in the state.
    pub async fn refresh_alerts(&self) -> Result<(), MastersError> {
        match self.source.fetch_alerts().await {
            Ok(alerts) => {
                debug!("Source returned {} master alerts", alerts.len());
                self.dispatch(MastersAction::SetAlerts(alerts)).await;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to fetch master alerts: {}", e);
                Err(MastersError::from_source(&e))
            }
        }
    }

    /// Refresh topology, then runtime data, then alerts
    ///
    /// Every step runs even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn refresh(&self) -> Result<(), MastersError> {
        let topology = self.refresh_topology().await;
        let runtime_data = self.refresh_runtime_data().await;
        let alerts = self.refresh_alerts().await;

        topology.and(runtime_data).and(alerts)
    }

    /// Start the monitor: refresh once, then keep refreshing in the background
    ///
    /// A failing initial refresh is logged and recorded, not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the monitor is already running.
    pub async fn start(&self) -> Result<(), MastersError> {
        self.config.validate()?;

        // Held until the task is registered so concurrent starts spawn once
        let mut background = self.background.write().await;
        if background.refresh_task.is_some() {
            return Err(MastersError::Configuration(
                "masters monitor already started".to_string(),
            ));
        }

        info!("Starting masters monitor");

        if let Err(e) = self.refresh().await {
            warn!("Initial masters refresh failed: {}", e);
        }

        self.start_refresh_task(&mut background);

        Ok(())
    }

    /// Shutdown the monitor
    pub async fn shutdown(&self) {
        info!("Shutting down masters monitor");

        let mut background = self.background.write().await;

        if let Some(shutdown_signal) = background.shutdown_signal.take() {
            let _ = shutdown_signal.send(());
        }

        if let Some(task) = background.refresh_task.take() {
            match tokio::time::timeout(self.config.shutdown_timeout, task).await {
                Ok(Ok(())) => debug!("Masters refresh task completed"),
                Ok(Err(e)) => error!("Masters refresh task panicked: {}", e),
                Err(_) => warn!("Masters refresh task did not shut down within timeout"),
            }
        }
    }

    /// Whether the background refresh task is running
    pub async fn is_running(&self) -> bool {
        self.background
            .read()
            .await
            .refresh_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn start_refresh_task(&self, background: &mut BackgroundState) {
        let monitor = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let mut topology_interval = interval(self.config.topology_refresh_interval);
        let mut runtime_data_interval = interval(self.config.runtime_data_refresh_interval);
        let mut alerts_interval = interval(self.config.alerts_refresh_interval);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = topology_interval.tick() => {
                        if let Err(e) = monitor.refresh_topology().await {
                            error!("Failed to refresh masters topology: {}", e);
                        }
                    }
                    _ = runtime_data_interval.tick() => {
                        if let Err(e) = monitor.refresh_runtime_data().await {
                            error!("Failed to refresh masters runtime data: {}", e);
                        }
                    }
                    _ = alerts_interval.tick() => {
                        // Already logged by refresh_alerts
                        let _ = monitor.refresh_alerts().await;
                    }
                    _ = &mut shutdown_rx => {
                        info!("Masters refresh task shutting down");
                        break;
                    }
                }
            }
        });

        background.refresh_task = Some(task);
        background.shutdown_signal = Some(shutdown_tx);
    }
}

/// Interval whose first tick is one period away, skipping missed ticks.
fn interval(period: std::time::Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

impl<S> Clone for MastersMonitor<S>
where
    S: MastersSource,
{
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
            publisher: Arc::clone(&self.publisher),
            background: Arc::clone(&self.background),
            config: self.config.clone(),
        }
    }
}

impl<S> Debug for MastersMonitor<S>
where
    S: MastersSource,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastersMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
