use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::capabilities::{
    BatchOpts, Capability, CapabilityDefinition, CapabilityListener, CapabilityRegistry,
    CapabilityValue, ChangeOpts, GetOpts, PendingChange, Resolution,
};
use crate::device::Channel;
use crate::error::{DriverError, Result};
use crate::zigbee::{
    AttributeReport, Cluster, MoveToLevelWithOnOff, ZigbeeNode,
    calculate_level_control_transition_time, dim_to_level, level_to_dim,
};

/// Lowest `dim` shown while the output is on, so the UI never reads as off.
pub const MIN_DIM_WHILE_ON: f64 = 0.01;

pub const PAIRING_REASON: &str = "pairing";

#[derive(Debug, Clone, Copy)]
pub struct DimmerConfig {
    /// Time the device gets to update `currentLevel` after being switched on.
    pub settle_delay: Duration,
    pub get_opts: GetOpts,
}

impl Default for DimmerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1000),
            get_opts: GetOpts {
                get_on_start: true,
                get_on_online: true,
            },
        }
    }
}

/// One gang of the EcoDim Duo dimmer, reconciling the platform's `onoff` and
/// `dim` capabilities with the device's OnOff and LevelControl clusters.
pub struct EcoDimDevice<N: ZigbeeNode, R: CapabilityRegistry> {
    channel: Channel,
    node: Arc<N>,
    registry: Arc<R>,
    config: DimmerConfig,
}

impl<N: ZigbeeNode, R: CapabilityRegistry> EcoDimDevice<N, R> {
    pub fn new(channel: Channel, node: Arc<N>, registry: Arc<R>, config: DimmerConfig) -> Self {
        Self {
            channel,
            node,
            registry,
            config,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn endpoint(&self) -> u8 {
        self.channel.endpoint()
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Brings the device up: hidden while capabilities are registered, then
    /// made available again. Availability failures only affect the UI and
    /// are logged.
    pub async fn on_node_init(&self) -> Result<()> {
        if let Err(e) = self.registry.set_unavailable(PAIRING_REASON).await {
            error!("Failed to mark {} channel unavailable: {}", self.channel, e);
        }

        if self.registry.has_capability(Capability::OnOff)
            && self.registry.has_capability(Capability::Dim)
        {
            self.register_on_off_and_dim_capabilities()?;
            if self.config.get_opts.get_on_start
                && let Err(e) = self.refresh_capabilities().await
            {
                warn!(
                    "Could not read initial state of {} channel: {}",
                    self.channel, e
                );
            }
        }

        if let Err(e) = self.registry.set_available().await {
            error!("Failed to mark {} channel available: {}", self.channel, e);
        }
        info!(
            "EcoDim Duo Dimmer Zigbee - {} device has been inited",
            self.channel
        );
        Ok(())
    }

    /// Called when the node re-announces itself, typically after mains power
    /// came back.
    pub async fn on_end_device_announce(&self) {
        if !self.config.get_opts.get_on_online {
            return;
        }
        if let Err(e) = self.refresh_capabilities().await {
            warn!(
                "Could not refresh {} channel after announce: {}",
                self.channel, e
            );
        }
    }

    pub fn capability_definitions(&self) -> [CapabilityDefinition; 2] {
        let endpoint = self.endpoint();
        [
            CapabilityDefinition {
                capability: Capability::OnOff,
                cluster: Cluster::OnOff,
                endpoint,
                get_opts: self.config.get_opts,
            },
            CapabilityDefinition {
                capability: Capability::Dim,
                cluster: Cluster::LevelControl,
                endpoint,
                get_opts: self.config.get_opts,
            },
        ]
    }

    fn register_on_off_and_dim_capabilities(&self) -> Result<()> {
        self.registry
            .register_multiple_capabilities(&self.capability_definitions())?;
        debug!(channel = %self.channel, endpoint = self.endpoint(), "Registered onoff and dim");
        Ok(())
    }

    fn cluster_endpoint(&self, cluster: Cluster) -> Result<u8> {
        let endpoint = self.endpoint();
        if self.node.has_cluster(endpoint, cluster) {
            Ok(endpoint)
        } else {
            Err(DriverError::MissingCluster { cluster, endpoint })
        }
    }

    /// Entry point for a debounced batch of `onoff`/`dim` edits. Returns the
    /// command that was sent, or `None` when the batch was empty.
    pub async fn on_pending_change(
        &self,
        change: PendingChange,
        opts: BatchOpts,
    ) -> Result<Option<Resolution>> {
        let change = sanitize(change)?;
        info!(
            channel = %self.channel,
            onoff_changed = change.onoff.is_some(),
            dim_changed = change.dim.is_some(),
            "capabilities changed"
        );

        let Some(resolution) = change.resolve() else {
            return Ok(None);
        };
        match resolution {
            Resolution::OnOff(on) => self.change_on_off(on).await?,
            Resolution::Dim(dim) => self.change_dim_level(dim, opts.dim).await?,
        }
        Ok(Some(resolution))
    }

    /// Switches the output. Turning off zeroes `dim`; turning on waits for the
    /// device to settle and then shows the level it came back with.
    pub async fn change_on_off(&self, on: bool) -> Result<()> {
        info!(channel = %self.channel, "Switching output {}", if on { "on" } else { "off" });
        let endpoint = self.cluster_endpoint(Cluster::OnOff)?;
        if on {
            self.node.set_on(endpoint).await?;
        } else {
            self.node.set_off(endpoint).await?;
        }

        if !on {
            self.set_capability(Capability::Dim, 0.0).await;
            return Ok(());
        }

        tokio::time::sleep(self.config.settle_delay).await;
        match self.read_current_level().await {
            Ok(level) => {
                debug!(channel = %self.channel, level, "Level read back after power-on");
                self.set_capability(Capability::Dim, dim_while_on(level))
                    .await;
            }
            Err(e) => {
                error!(
                    "Could not update dim capability value after `onoff` change: {}",
                    e
                );
            }
        }
        Ok(())
    }

    /// Moves the output to `dim` (0..=1) and brings `onoff` in line with it.
    pub async fn change_dim_level(&self, dim: f64, opts: ChangeOpts) -> Result<()> {
        info!(channel = %self.channel, "Dimming output to {}", dim);
        let endpoint = self.cluster_endpoint(Cluster::LevelControl)?;
        let command = MoveToLevelWithOnOff {
            level: dim_to_level(dim),
            transition_time: calculate_level_control_transition_time(opts.duration),
        };
        debug!(channel = %self.channel, endpoint, ?command, "Sending moveToLevelWithOnOff");
        self.node
            .move_to_level_with_on_off(endpoint, command)
            .await?;

        if dim == 0.0 {
            self.set_capability(Capability::OnOff, false).await;
        } else if self.displayed_on_off() != Some(true) {
            self.set_capability(Capability::OnOff, true).await;
        }
        Ok(())
    }

    /// Reads on/off and level from the device and shows them.
    pub async fn refresh_capabilities(&self) -> Result<()> {
        let on_off_endpoint = self.cluster_endpoint(Cluster::OnOff)?;
        let on = self.node.read_on_off(on_off_endpoint).await?;
        let level = self.read_current_level().await?;
        debug!(channel = %self.channel, on, level, "Refreshed state from device");

        self.set_capability(Capability::OnOff, on).await;
        let dim = if on { dim_while_on(level) } else { 0.0 };
        self.set_capability(Capability::Dim, dim).await;
        Ok(())
    }

    /// Applies an attribute report from the device. Reports for the other
    /// gang are ignored.
    pub async fn handle_attribute_report(&self, report: AttributeReport) {
        if report.endpoint() != self.endpoint() {
            return;
        }
        match report {
            AttributeReport::OnOff { on, .. } => {
                info!(channel = %self.channel, on, "Received onOff report");
                self.set_capability(Capability::OnOff, on).await;
                if !on {
                    self.set_capability(Capability::Dim, 0.0).await;
                }
            }
            AttributeReport::CurrentLevel { level, .. } => {
                // The level register keeps its value while the output is off.
                if self.displayed_on_off() == Some(false) {
                    debug!(channel = %self.channel, level, "Ignoring level report while off");
                    return;
                }
                info!(channel = %self.channel, level, "Received currentLevel report");
                self.set_capability(Capability::Dim, level_to_dim(level))
                    .await;
                if level == 0 {
                    self.set_capability(Capability::OnOff, false).await;
                } else if self.displayed_on_off() != Some(true) {
                    self.set_capability(Capability::OnOff, true).await;
                }
            }
        }
    }

    async fn read_current_level(&self) -> Result<u8> {
        let endpoint = self.cluster_endpoint(Cluster::LevelControl)?;
        Ok(self.node.read_current_level(endpoint).await?)
    }

    fn displayed_on_off(&self) -> Option<bool> {
        self.registry
            .capability_value(Capability::OnOff)
            .and_then(|value| value.as_bool())
    }

    async fn set_capability(&self, capability: Capability, value: impl Into<CapabilityValue>) {
        if let Err(e) = self
            .registry
            .set_capability_value(capability, value.into())
            .await
        {
            error!(
                "Failed to set {} on {} channel: {}",
                capability, self.channel, e
            );
        }
    }
}

#[async_trait]
impl<N: ZigbeeNode, R: CapabilityRegistry> CapabilityListener for EcoDimDevice<N, R> {
    async fn on_capabilities_changed(
        &self,
        change: PendingChange,
        opts: BatchOpts,
    ) -> Result<Option<Resolution>> {
        self.on_pending_change(change, opts).await
    }
}

fn dim_while_on(level: u8) -> f64 {
    level_to_dim(level).max(MIN_DIM_WHILE_ON)
}

fn sanitize(mut change: PendingChange) -> Result<PendingChange> {
    if let Some(dim) = change.dim {
        if !dim.is_finite() {
            return Err(DriverError::InvalidDim(dim));
        }
        change.dim = Some(dim.clamp(0.0, 1.0));
    }
    Ok(change)
}
