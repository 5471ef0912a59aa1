use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::capabilities::{
    Capability, CapabilityDefinition, CapabilityRegistry, CapabilityValue, PendingChange,
    RegistryError,
};

/// Capability values of one device as the platform shows them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapabilitySnapshot {
    pub onoff: Option<bool>,
    pub dim: Option<f64>,
}

/// In-memory [`CapabilityRegistry`] for a single device.
pub struct MemoryRegistry {
    capabilities: Vec<Capability>,
    values: DashMap<Capability, CapabilityValue>,
    available: AtomicBool,
    unavailable_reason: RwLock<Option<String>>,
    definitions: RwLock<Vec<CapabilityDefinition>>,
    updates: RwLock<Vec<(Capability, CapabilityValue)>>,
    fail_updates: AtomicBool,
}

impl MemoryRegistry {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
            values: DashMap::new(),
            available: AtomicBool::new(false),
            unavailable_reason: RwLock::new(None),
            definitions: RwLock::new(vec![]),
            updates: RwLock::new(vec![]),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Registry exposing both `onoff` and `dim`, showing the output as off.
    pub fn dimmer() -> Self {
        let registry = Self::new([Capability::OnOff, Capability::Dim]);
        registry.seed(Capability::OnOff, false);
        registry.seed(Capability::Dim, 0.0);
        registry
    }

    /// Stores a value without going through the device-facing setter.
    pub fn seed(&self, capability: Capability, value: impl Into<CapabilityValue>) {
        self.values.insert(capability, value.into());
    }

    pub fn onoff(&self) -> Option<bool> {
        self.capability_value(Capability::OnOff)
            .and_then(|value| value.as_bool())
    }

    pub fn dim(&self) -> Option<f64> {
        self.capability_value(Capability::Dim)
            .and_then(|value| value.as_f64())
    }

    pub fn snapshot(&self) -> CapabilitySnapshot {
        CapabilitySnapshot {
            onoff: self.onoff(),
            dim: self.dim(),
        }
    }

    /// Shows the values of a user edit before the device has acted on it.
    /// `dim` is kept within 0..=1, the same range the device is driven to.
    pub fn commit(&self, change: &PendingChange) {
        if let Some(onoff) = change.onoff {
            self.seed(Capability::OnOff, onoff);
        }
        if let Some(dim) = change.dim {
            self.seed(Capability::Dim, dim.clamp(0.0, 1.0));
        }
    }

    /// Puts back values captured by [`MemoryRegistry::snapshot`].
    pub fn restore(&self, snapshot: CapabilitySnapshot) {
        match snapshot.onoff {
            Some(onoff) => self.seed(Capability::OnOff, onoff),
            None => {
                self.values.remove(&Capability::OnOff);
            }
        }
        match snapshot.dim {
            Some(dim) => self.seed(Capability::Dim, dim),
            None => {
                self.values.remove(&Capability::Dim);
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        self.unavailable_reason.read().clone()
    }

    pub fn definitions(&self) -> Vec<CapabilityDefinition> {
        self.definitions.read().clone()
    }

    /// Values written by the device, oldest first.
    pub fn updates(&self) -> Vec<(Capability, CapabilityValue)> {
        self.updates.read().clone()
    }

    /// Makes every device-facing write fail until switched back.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::Release);
    }

    fn check_failure(&self) -> Result<(), RegistryError> {
        if self.fail_updates.load(Ordering::Acquire) {
            Err(RegistryError::Generic("registry is not accepting updates".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CapabilityRegistry for MemoryRegistry {
    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn capability_value(&self, capability: Capability) -> Option<CapabilityValue> {
        self.values.get(&capability).map(|value| *value)
    }

    async fn set_capability_value(
        &self,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), RegistryError> {
        self.check_failure()?;
        if !self.has_capability(capability) {
            return Err(RegistryError::UnknownCapability(capability));
        }
        match (capability, value) {
            (Capability::OnOff, CapabilityValue::Bool(_)) => {}
            (Capability::Dim, CapabilityValue::Number(dim)) if (0.0..=1.0).contains(&dim) => {}
            (capability, value) => {
                return Err(RegistryError::InvalidValue {
                    capability,
                    reason: format!("{value:?} is out of range"),
                });
            }
        }
        debug!(%capability, ?value, "Capability value set");
        self.values.insert(capability, value);
        self.updates.write().push((capability, value));
        Ok(())
    }

    async fn set_available(&self) -> Result<(), RegistryError> {
        self.check_failure()?;
        self.available.store(true, Ordering::Release);
        *self.unavailable_reason.write() = None;
        Ok(())
    }

    async fn set_unavailable(&self, reason: &str) -> Result<(), RegistryError> {
        self.check_failure()?;
        self.available.store(false, Ordering::Release);
        *self.unavailable_reason.write() = Some(reason.to_string());
        Ok(())
    }

    fn register_multiple_capabilities(
        &self,
        definitions: &[CapabilityDefinition],
    ) -> Result<(), RegistryError> {
        if let Some(missing) = definitions
            .iter()
            .find(|definition| !self.has_capability(definition.capability))
        {
            return Err(RegistryError::UnknownCapability(missing.capability));
        }
        *self.definitions.write() = definitions.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zigbee::Cluster;
    use crate::capabilities::GetOpts;

    #[tokio::test]
    async fn test_set_and_read_values() {
        let registry = MemoryRegistry::dimmer();
        assert_eq!(registry.onoff(), Some(false));
        registry
            .set_capability_value(Capability::Dim, 0.4.into())
            .await
            .unwrap();
        assert_eq!(registry.dim(), Some(0.4));
        assert_eq!(
            registry.updates(),
            vec![(Capability::Dim, CapabilityValue::Number(0.4))]
        );
    }

    #[tokio::test]
    async fn test_rejects_bad_values() {
        let registry = MemoryRegistry::dimmer();
        assert!(matches!(
            registry
                .set_capability_value(Capability::Dim, true.into())
                .await,
            Err(RegistryError::InvalidValue { .. })
        ));
        assert!(matches!(
            registry
                .set_capability_value(Capability::Dim, 1.5.into())
                .await,
            Err(RegistryError::InvalidValue { .. })
        ));
        let onoff_only = MemoryRegistry::new([Capability::OnOff]);
        assert_eq!(
            onoff_only
                .set_capability_value(Capability::Dim, 0.5.into())
                .await,
            Err(RegistryError::UnknownCapability(Capability::Dim))
        );
    }

    #[tokio::test]
    async fn test_failing_updates() {
        let registry = MemoryRegistry::dimmer();
        registry.set_fail_updates(true);
        assert!(
            registry
                .set_capability_value(Capability::OnOff, true.into())
                .await
                .is_err()
        );
        assert!(registry.set_available().await.is_err());
        assert_eq!(registry.onoff(), Some(false));
        assert!(registry.updates().is_empty());
    }

    #[tokio::test]
    async fn test_availability() {
        let registry = MemoryRegistry::dimmer();
        registry.set_unavailable("pairing").await.unwrap();
        assert!(!registry.is_available());
        assert_eq!(registry.unavailable_reason().as_deref(), Some("pairing"));
        registry.set_available().await.unwrap();
        assert!(registry.is_available());
        assert_eq!(registry.unavailable_reason(), None);
    }

    #[test]
    fn test_commit_and_restore() {
        let registry = MemoryRegistry::dimmer();
        let before = registry.snapshot();
        registry.commit(&PendingChange::both(true, 0.6));
        assert_eq!(registry.onoff(), Some(true));
        assert_eq!(registry.dim(), Some(0.6));
        registry.restore(before);
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn test_commit_clamps_dim() {
        let registry = MemoryRegistry::dimmer();
        registry.commit(&PendingChange::dim(1.4));
        assert_eq!(registry.dim(), Some(1.0));
        registry.commit(&PendingChange::dim(-0.2));
        assert_eq!(registry.dim(), Some(0.0));
    }

    #[test]
    fn test_register_unknown_capability() {
        let registry = MemoryRegistry::new([Capability::OnOff]);
        let definitions = [CapabilityDefinition {
            capability: Capability::Dim,
            cluster: Cluster::LevelControl,
            endpoint: 2,
            get_opts: GetOpts::default(),
        }];
        assert_eq!(
            registry.register_multiple_capabilities(&definitions),
            Err(RegistryError::UnknownCapability(Capability::Dim))
        );
        assert!(registry.definitions().is_empty());
    }
}
