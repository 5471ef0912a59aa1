use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::zigbee::{Cluster, MoveToLevelWithOnOff, ZigbeeError, ZigbeeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCall {
    SetOn(u8),
    SetOff(u8),
    MoveToLevel(u8, MoveToLevelWithOnOff),
    ReadOnOff(u8),
    ReadCurrentLevel(u8),
}

impl NodeCall {
    fn is_command(&self) -> bool {
        matches!(
            self,
            NodeCall::SetOn(_) | NodeCall::SetOff(_) | NodeCall::MoveToLevel(..)
        )
    }
}

/// Records every call and answers reads from two atomics.
#[derive(Clone)]
pub struct FakeZigbeeNode {
    pub calls: Arc<RwLock<Vec<NodeCall>>>,
    pub on_off: Arc<AtomicBool>,
    pub current_level: Arc<AtomicU8>,
    pub fail_commands: Arc<AtomicBool>,
    pub fail_reads: Arc<AtomicBool>,
    pub missing: Arc<parking_lot::RwLock<Vec<(u8, Cluster)>>>,
}

impl Default for FakeZigbeeNode {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            on_off: Arc::new(AtomicBool::new(false)),
            current_level: Arc::new(AtomicU8::new(254)),
            fail_commands: Arc::default(),
            fail_reads: Arc::default(),
            missing: Arc::default(),
        }
    }
}

impl FakeZigbeeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: u8) -> Self {
        let node = Self::default();
        node.current_level.store(level, Ordering::Relaxed);
        node
    }

    pub fn failing() -> Self {
        let node = Self::default();
        node.fail_commands.store(true, Ordering::Relaxed);
        node
    }

    pub fn without_cluster(endpoint: u8, cluster: Cluster) -> Self {
        let node = Self::default();
        node.missing.write().push((endpoint, cluster));
        node
    }

    /// Commands only, reads left out.
    pub async fn commands(&self) -> Vec<NodeCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.is_command())
            .copied()
            .collect()
    }

    async fn command(&self, call: NodeCall) -> Result<(), ZigbeeError> {
        if self.fail_commands.load(Ordering::Relaxed) {
            return Err(ZigbeeError::Timeout(match call {
                NodeCall::SetOn(endpoint)
                | NodeCall::SetOff(endpoint)
                | NodeCall::MoveToLevel(endpoint, _)
                | NodeCall::ReadOnOff(endpoint)
                | NodeCall::ReadCurrentLevel(endpoint) => endpoint,
            }));
        }
        self.calls.write().await.push(call);
        Ok(())
    }

    async fn read(&self, call: NodeCall) -> Result<(), ZigbeeError> {
        self.calls.write().await.push(call);
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(ZigbeeError::Transport("Fake read error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ZigbeeNode for FakeZigbeeNode {
    fn has_cluster(&self, endpoint: u8, cluster: Cluster) -> bool {
        !self.missing.read().contains(&(endpoint, cluster))
    }

    async fn set_on(&self, endpoint: u8) -> Result<(), ZigbeeError> {
        self.command(NodeCall::SetOn(endpoint)).await?;
        self.on_off.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn set_off(&self, endpoint: u8) -> Result<(), ZigbeeError> {
        self.command(NodeCall::SetOff(endpoint)).await?;
        self.on_off.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn move_to_level_with_on_off(
        &self,
        endpoint: u8,
        command: MoveToLevelWithOnOff,
    ) -> Result<(), ZigbeeError> {
        self.command(NodeCall::MoveToLevel(endpoint, command))
            .await?;
        self.current_level.store(command.level, Ordering::Relaxed);
        self.on_off.store(command.level > 0, Ordering::Relaxed);
        Ok(())
    }

    async fn read_on_off(&self, endpoint: u8) -> Result<bool, ZigbeeError> {
        self.read(NodeCall::ReadOnOff(endpoint)).await?;
        Ok(self.on_off.load(Ordering::Relaxed))
    }

    async fn read_current_level(&self, endpoint: u8) -> Result<u8, ZigbeeError> {
        self.read(NodeCall::ReadCurrentLevel(endpoint)).await?;
        Ok(self.current_level.load(Ordering::Relaxed))
    }
}
