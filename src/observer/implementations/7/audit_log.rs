// Ring 7: Audit Observer - records every committed status transition

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::repository;
use crate::observer::error::ObserverError;
use crate::observer::event::{EventKind, ProjectEvent};
use crate::observer::traits::{ObserverRing, PostCommitObserver};
use crate::types::ProjectStatus;

pub struct AuditLogObserver {
    pool: PgPool,
}

impl AuditLogObserver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// (entity id, old status, new status, actor) for a status-changing event
fn status_change(event: &ProjectEvent) -> (i64, Option<ProjectStatus>, ProjectStatus, i64) {
    match event {
        ProjectEvent::Submitted {
            project_id,
            actor_id,
            old_status,
            ..
        } => (*project_id, *old_status, ProjectStatus::Pending, *actor_id),
        ProjectEvent::Reviewed {
            project_id,
            reviewer_id,
            old_status,
            new_status,
            ..
        } => (*project_id, Some(*old_status), *new_status, *reviewer_id),
    }
}

#[async_trait]
impl PostCommitObserver for AuditLogObserver {
    fn name(&self) -> &'static str {
        "AuditLogObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Audit
    }

    fn applies_to(&self, _kind: EventKind) -> bool {
        true
    }

    async fn observe(&self, event: &ProjectEvent) -> Result<(), ObserverError> {
        let (project_id, old, new, actor) = status_change(event);

        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        repository::insert_audit_entry(
            &mut *conn,
            "project",
            project_id,
            "status",
            old.map(|s| s.as_str()),
            Some(new.as_str()),
            Some(actor),
        )
        .await?;

        tracing::debug!(project_id, old = ?old, new = %new, "audit entry written");
        Ok(())
    }
}
