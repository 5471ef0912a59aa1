use std::time::Duration;

/// Per-capability options delivered with a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeOpts {
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOpts {
    pub onoff: ChangeOpts,
    pub dim: ChangeOpts,
}

impl BatchOpts {
    /// Options from a later edit replace earlier ones where they say anything.
    pub fn merge(&mut self, other: BatchOpts) {
        if other.onoff.duration.is_some() {
            self.onoff = other.onoff;
        }
        if other.dim.duration.is_some() {
            self.dim = other.dim;
        }
    }
}

/// One debounced batch of capability edits. `None` means the capability was
/// not touched in this batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingChange {
    pub onoff: Option<bool>,
    pub dim: Option<f64>,
}

/// The single native command a batch boils down to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    OnOff(bool),
    Dim(f64),
}

impl PendingChange {
    pub fn onoff(value: bool) -> Self {
        Self {
            onoff: Some(value),
            dim: None,
        }
    }

    pub fn dim(value: f64) -> Self {
        Self {
            onoff: None,
            dim: Some(value),
        }
    }

    pub fn both(onoff: bool, dim: f64) -> Self {
        Self {
            onoff: Some(onoff),
            dim: Some(dim),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.onoff.is_none() && self.dim.is_none()
    }

    /// Folds a later edit into this batch; the later value wins.
    pub fn merge(&mut self, other: PendingChange) {
        if other.onoff.is_some() {
            self.onoff = other.onoff;
        }
        if other.dim.is_some() {
            self.dim = other.dim;
        }
    }

    /// Picks the native command for this batch.
    ///
    /// A non-zero level implies "on", and "off" beats any requested level.
    /// An explicit "on at zero" is sent as a zero-level dim rather than an on
    /// command, which leaves the output off.
    pub fn resolve(&self) -> Option<Resolution> {
        match (self.onoff, self.dim) {
            (Some(true), Some(dim)) if dim > 0.0 => Some(Resolution::Dim(dim)),
            (Some(false), Some(_)) => Some(Resolution::OnOff(false)),
            (Some(true), Some(_)) => Some(Resolution::Dim(0.0)),
            (Some(onoff), None) => Some(Resolution::OnOff(onoff)),
            (None, Some(dim)) => Some(Resolution::Dim(dim)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_with_level_dims() {
        assert_eq!(
            PendingChange::both(true, 0.5).resolve(),
            Some(Resolution::Dim(0.5))
        );
    }

    #[test]
    fn test_off_discards_level() {
        assert_eq!(
            PendingChange::both(false, 0.8).resolve(),
            Some(Resolution::OnOff(false))
        );
        assert_eq!(
            PendingChange::both(false, 0.0).resolve(),
            Some(Resolution::OnOff(false))
        );
    }

    #[test]
    fn test_on_at_zero_dims_to_zero() {
        assert_eq!(
            PendingChange::both(true, 0.0).resolve(),
            Some(Resolution::Dim(0.0))
        );
    }

    #[test]
    fn test_single_capability() {
        assert_eq!(
            PendingChange::onoff(true).resolve(),
            Some(Resolution::OnOff(true))
        );
        assert_eq!(
            PendingChange::onoff(false).resolve(),
            Some(Resolution::OnOff(false))
        );
        assert_eq!(
            PendingChange::dim(0.3).resolve(),
            Some(Resolution::Dim(0.3))
        );
        assert_eq!(PendingChange::dim(0.0).resolve(), Some(Resolution::Dim(0.0)));
    }

    #[test]
    fn test_empty_is_noop() {
        let change = PendingChange::default();
        assert!(change.is_empty());
        assert_eq!(change.resolve(), None);
    }

    #[test]
    fn test_merge_keeps_latest() {
        let mut change = PendingChange::dim(0.2);
        change.merge(PendingChange::onoff(true));
        change.merge(PendingChange::dim(0.7));
        assert_eq!(change, PendingChange::both(true, 0.7));
    }

    #[test]
    fn test_merge_opts() {
        let mut opts = BatchOpts {
            dim: ChangeOpts {
                duration: Some(Duration::from_secs(2)),
            },
            ..Default::default()
        };
        opts.merge(BatchOpts::default());
        assert_eq!(opts.dim.duration, Some(Duration::from_secs(2)));
        opts.merge(BatchOpts {
            dim: ChangeOpts {
                duration: Some(Duration::from_millis(300)),
            },
            ..Default::default()
        });
        assert_eq!(opts.dim.duration, Some(Duration::from_millis(300)));
        assert_eq!(opts.onoff.duration, None);
    }
}
