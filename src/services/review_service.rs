// Administrator review: pending -> approved | rejected.
//
// Each attempt is a fresh transaction that row-locks the project with a
// bounded lock wait. Lock-wait timeouts are retried with exponential backoff;
// everything else aborts. Audit and owner notification run after commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;

use crate::database::manager::DatabaseManager;
use crate::database::models::ProjectReview;
use crate::database::repository;
use crate::database::retry::{retry_transient, RetryError, RetryPolicy};
use crate::observer::{ObserverPipeline, ProjectEvent};
use crate::services::{Actor, ServiceError};
use crate::types::ProjectStatus;

/// Transition summary returned to the reviewing administrator
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub project_id: i64,
    pub old_status: ProjectStatus,
    pub new_status: ProjectStatus,
    pub comment: Option<String>,
    pub reviewer_id: i64,
    pub reviewed_at: DateTime<Utc>,
    pub review: ProjectReview,
}

/// What one committed attempt produced
struct CommittedReview {
    title: String,
    owner_id: i64,
    old_status: ProjectStatus,
    review: ProjectReview,
}

pub struct ReviewWorkflow {
    pool: PgPool,
    policy: RetryPolicy,
    lock_timeout: Duration,
    observers: ObserverPipeline,
}

impl ReviewWorkflow {
    pub fn new(
        pool: PgPool,
        policy: RetryPolicy,
        lock_timeout: Duration,
        observers: ObserverPipeline,
    ) -> Self {
        Self {
            pool,
            policy,
            lock_timeout,
            observers,
        }
    }

    /// Move a pending project to `new_status` and record the decision
    pub async fn review_project(
        &self,
        project_id: i64,
        actor: &Actor,
        new_status: ProjectStatus,
        comment: Option<String>,
    ) -> Result<ReviewOutcome, ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::Forbidden("Only administrators can review projects".into()));
        }
        if !new_status.is_review_outcome() {
            return Err(ServiceError::field("status", "Status must be approved or rejected"));
        }

        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        let admin_id = actor.user_id;

        let committed = retry_transient(self.policy, "review_project", |attempt| {
            let comment = comment.clone();
            async move {
                tracing::debug!(project_id, admin_id, attempt, "review attempt");
                self.review_attempt(project_id, admin_id, new_status, comment.as_deref()).await
            }
        })
        .await
        .map_err(|err| match err {
            RetryError::Exhausted { attempts, last } => {
                tracing::error!(
                    project_id,
                    attempts,
                    error = %last,
                    "review abandoned, project busy"
                );
                ServiceError::Busy { attempts }
            }
            RetryError::Aborted(e) => e,
        })?;

        tracing::info!(
            project_id,
            admin_id,
            old_status = %committed.old_status,
            new_status = %new_status,
            "project reviewed"
        );

        self.observers.dispatch(ProjectEvent::Reviewed {
            project_id,
            title: committed.title,
            owner_id: committed.owner_id,
            reviewer_id: admin_id,
            old_status: committed.old_status,
            new_status,
            comment: comment.clone(),
        });

        Ok(ReviewOutcome {
            project_id,
            old_status: committed.old_status,
            new_status,
            comment,
            reviewer_id: admin_id,
            reviewed_at: committed.review.created_at,
            review: committed.review,
        })
    }

    async fn review_attempt(
        &self,
        project_id: i64,
        admin_id: i64,
        new_status: ProjectStatus,
        comment: Option<&str>,
    ) -> Result<CommittedReview, ServiceError> {
        let mut tx = DatabaseManager::begin_with_lock_timeout(&self.pool, self.lock_timeout).await?;

        let row = repository::lock_project_row(&mut *tx, project_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Project {} not found", project_id)))?;

        check_transition(row.status, new_status)?;

        repository::set_project_status(&mut *tx, project_id, new_status).await?;
        let review = repository::insert_review(
            &mut *tx,
            project_id,
            admin_id,
            row.status,
            new_status,
            comment,
        )
        .await?;

        tx.commit().await?;

        Ok(CommittedReview {
            title: row.title,
            owner_id: row.owner_id,
            old_status: row.status,
            review,
        })
    }

    /// Decisions recorded for a project, newest first
    pub async fn review_history(
        &self,
        project_id: i64,
    ) -> Result<Vec<ProjectReview>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        if repository::fetch_project_row(&mut *conn, project_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Project {} not found", project_id)));
        }
        Ok(repository::fetch_reviews(&mut *conn, project_id).await?)
    }
}

/// Only pending projects can be reviewed, and never into their own status
fn check_transition(current: ProjectStatus, requested: ProjectStatus) -> Result<(), ServiceError> {
    if current == requested {
        return Err(ServiceError::Conflict(format!("Project is already {}", current)));
    }
    if current != ProjectStatus::Pending {
        return Err(ServiceError::Conflict(format!(
            "Project was already {}; it must be resubmitted before another review",
            current
        )));
    }
    Ok(())
}
