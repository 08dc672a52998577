// Ring 9: Notification Observer - tells administrators a project awaits review

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::repository;
use crate::observer::error::ObserverError;
use crate::observer::event::{EventKind, ProjectEvent};
use crate::observer::traits::{ObserverRing, PostCommitObserver};
use crate::services::notification::{Notification, NotificationDispatcher};

pub struct AdminReviewNotifier {
    pool: PgPool,
    dispatchers: Vec<Arc<dyn NotificationDispatcher>>,
}

impl AdminReviewNotifier {
    pub fn new(pool: PgPool, dispatchers: Vec<Arc<dyn NotificationDispatcher>>) -> Self {
        Self { pool, dispatchers }
    }
}

#[async_trait]
impl PostCommitObserver for AdminReviewNotifier {
    fn name(&self) -> &'static str {
        "AdminReviewNotifier"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Notification
    }

    fn applies_to(&self, kind: EventKind) -> bool {
        kind == EventKind::Submitted
    }

    async fn observe(&self, event: &ProjectEvent) -> Result<(), ObserverError> {
        let ProjectEvent::Submitted {
            project_id,
            title,
            resubmission,
            ..
        } = event
        else {
            return Ok(());
        };

        let admins = {
            let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
            repository::admin_ids(&mut *conn).await?
        };

        // one failing channel or recipient does not stop the rest
        let mut last_error = None;
        for admin_id in admins {
            let notification =
                Notification::review_requested(admin_id, *project_id, title, *resubmission);
            for dispatcher in &self.dispatchers {
                if let Err(e) = dispatcher.dispatch(&notification).await {
                    tracing::warn!(
                        dispatcher = dispatcher.name(),
                        admin_id,
                        error = %e,
                        "admin notification failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
