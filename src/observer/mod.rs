// Post-commit observer system: audit trail and notifications that run after
// a project transaction commits

pub mod error;
pub mod event;
pub mod implementations;
pub mod pipeline;
pub mod traits;

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub use error::ObserverError;
pub use event::{EventKind, ProjectEvent};
pub use implementations::*;
pub use pipeline::ObserverPipeline;
pub use traits::{ObserverRing, PostCommitObserver};

use crate::services::notification::NotificationDispatcher;

/// Pipeline with the standard audit and notification observers registered
pub fn default_pipeline(
    pool: PgPool,
    dispatchers: Vec<Arc<dyn NotificationDispatcher>>,
    deadline: Duration,
) -> ObserverPipeline {
    let mut pipeline = ObserverPipeline::new().with_timeout(deadline);
    pipeline.register(Arc::new(AuditLogObserver::new(pool.clone())));
    pipeline.register(Arc::new(AdminReviewNotifier::new(pool, dispatchers.clone())));
    pipeline.register(Arc::new(OwnerDecisionNotifier::new(dispatchers)));
    pipeline
}
