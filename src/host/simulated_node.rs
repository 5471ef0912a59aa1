use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use derive_builder::Builder;
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::zigbee::{Cluster, MAX_DIM, MoveToLevelWithOnOff, ZigbeeError, ZigbeeNode};

#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct SimulatedNodeOptions {
    pub endpoints: Vec<u8>,
    /// Round-trip time of every request.
    pub latency: Duration,
    /// Extra random delay added on top of `latency`.
    pub jitter: Duration,
    /// How long `currentLevel` keeps its old value after a power-on.
    pub level_settle: Duration,
    pub initial_level: u8,
}

impl Default for SimulatedNodeOptions {
    fn default() -> Self {
        Self {
            endpoints: vec![1, 2],
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            level_settle: Duration::ZERO,
            initial_level: MAX_DIM,
        }
    }
}

impl SimulatedNodeOptions {
    pub fn builder() -> SimulatedNodeOptionsBuilder {
        SimulatedNodeOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOperation {
    SetOn,
    SetOff,
    MoveToLevel,
    ReadOnOff,
    ReadCurrentLevel,
}

#[derive(Debug, Clone)]
struct EndpointState {
    on: bool,
    level: u8,
    /// Level restored by a plain "on" after the output was dimmed to zero.
    restore_level: u8,
    /// Value `currentLevel` reports until the given instant.
    stale_level: Option<(u8, Instant)>,
    clusters: Vec<Cluster>,
}

impl EndpointState {
    fn new(level: u8) -> Self {
        Self {
            on: false,
            level,
            restore_level: level.max(1),
            stale_level: None,
            clusters: vec![Cluster::OnOff, Cluster::LevelControl],
        }
    }

    fn reported_level(&self, now: Instant) -> u8 {
        match self.stale_level {
            Some((level, until)) if now < until => level,
            _ => self.level,
        }
    }
}

/// Dual-gang dimmer living in memory, for running the driver without a
/// Zigbee stick.
pub struct SimulatedNode {
    id: Uuid,
    options: SimulatedNodeOptions,
    endpoints: DashMap<u8, EndpointState>,
    failures: DashMap<NodeOperation, ZigbeeError>,
}

impl SimulatedNode {
    pub fn new(options: SimulatedNodeOptions) -> Self {
        let endpoints = options
            .endpoints
            .iter()
            .map(|endpoint| (*endpoint, EndpointState::new(options.initial_level)))
            .collect();
        Self {
            id: Uuid::new_v4(),
            options,
            endpoints,
            failures: DashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Makes every following `operation` fail with `error`.
    pub fn fail(&self, operation: NodeOperation, error: ZigbeeError) {
        self.failures.insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    pub fn remove_cluster(&self, endpoint: u8, cluster: Cluster) {
        if let Some(mut state) = self.endpoints.get_mut(&endpoint) {
            state.clusters.retain(|c| *c != cluster);
        }
    }

    /// Actual output state of an endpoint, as opposed to what it reports.
    pub fn output(&self, endpoint: u8) -> Option<(bool, u8)> {
        self.endpoints
            .get(&endpoint)
            .map(|state| (state.on, state.level))
    }

    /// Changes the output as if someone pressed the wall switch.
    pub fn press(&self, endpoint: u8, on: bool) {
        if let Some(mut state) = self.endpoints.get_mut(&endpoint) {
            state.on = on;
        }
    }

    async fn round_trip(&self, endpoint: u8, operation: NodeOperation) -> Result<(), ZigbeeError> {
        let mut delay = self.options.latency;
        if !self.options.jitter.is_zero() {
            let jitter_ms = self.options.jitter.as_millis() as u64;
            delay += Duration::from_millis(rand::rng().random_range(0..=jitter_ms));
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(&operation) {
            return Err(error.value().clone());
        }
        if !self.endpoints.contains_key(&endpoint) {
            return Err(ZigbeeError::UnknownEndpoint(endpoint));
        }
        debug!(node = %self.id, endpoint, ?operation, "Simulated request");
        Ok(())
    }

    fn with_endpoint<T>(
        &self,
        endpoint: u8,
        f: impl FnOnce(&mut EndpointState) -> T,
    ) -> Result<T, ZigbeeError> {
        self.endpoints
            .get_mut(&endpoint)
            .map(|mut state| f(&mut *state))
            .ok_or(ZigbeeError::UnknownEndpoint(endpoint))
    }
}

#[async_trait]
impl ZigbeeNode for SimulatedNode {
    fn has_cluster(&self, endpoint: u8, cluster: Cluster) -> bool {
        self.endpoints
            .get(&endpoint)
            .is_some_and(|state| state.clusters.contains(&cluster))
    }

    async fn set_on(&self, endpoint: u8) -> Result<(), ZigbeeError> {
        self.round_trip(endpoint, NodeOperation::SetOn).await?;
        let settle = self.options.level_settle;
        self.with_endpoint(endpoint, |state| {
            let previous = state.level;
            if state.level == 0 {
                state.level = state.restore_level;
            }
            state.on = true;
            if !settle.is_zero() {
                state.stale_level = Some((previous, Instant::now() + settle));
            }
        })
    }

    async fn set_off(&self, endpoint: u8) -> Result<(), ZigbeeError> {
        self.round_trip(endpoint, NodeOperation::SetOff).await?;
        self.with_endpoint(endpoint, |state| {
            state.on = false;
            state.stale_level = None;
        })
    }

    async fn move_to_level_with_on_off(
        &self,
        endpoint: u8,
        command: MoveToLevelWithOnOff,
    ) -> Result<(), ZigbeeError> {
        self.round_trip(endpoint, NodeOperation::MoveToLevel)
            .await?;
        if command.level > MAX_DIM {
            return Err(ZigbeeError::Rejected(format!(
                "level {} is out of range",
                command.level
            )));
        }
        self.with_endpoint(endpoint, |state| {
            state.level = command.level;
            state.on = command.level > 0;
            if command.level > 0 {
                state.restore_level = command.level;
            }
            state.stale_level = None;
        })
    }

    async fn read_on_off(&self, endpoint: u8) -> Result<bool, ZigbeeError> {
        self.round_trip(endpoint, NodeOperation::ReadOnOff).await?;
        self.with_endpoint(endpoint, |state| state.on)
    }

    async fn read_current_level(&self, endpoint: u8) -> Result<u8, ZigbeeError> {
        self.round_trip(endpoint, NodeOperation::ReadCurrentLevel)
            .await?;
        let now = Instant::now();
        self.with_endpoint(endpoint, |state| state.reported_level(now))
    }
}
