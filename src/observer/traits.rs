use async_trait::async_trait;
use std::time::Duration;

use crate::observer::error::ObserverError;
use crate::observer::event::{EventKind, ProjectEvent};

/// Post-commit rings. Both run detached from the request after the
/// transaction has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    Audit = 7,        // Change tracking
    Notification = 9, // User notifications
}

/// Side effect triggered by a committed project change
#[async_trait]
pub trait PostCommitObserver: Send + Sync {
    /// Observer name for logging
    fn name(&self) -> &'static str;

    fn ring(&self) -> ObserverRing;

    /// Check if observer cares about this event
    fn applies_to(&self, kind: EventKind) -> bool;

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn observe(&self, event: &ProjectEvent) -> Result<(), ObserverError>;
}
