use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::database::repository;
use crate::types::ProjectStatus;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification store failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("webhook delivery failed: {0}")]
    Webhook(#[from] reqwest::Error),

    #[error("webhook rejected notification with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Tells an administrator a project awaits review
    ReviewRequested,
    /// Tells the owner how their project was reviewed
    ReviewDecided,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ReviewRequested => "review_requested",
            NotificationKind::ReviewDecided => "review_decided",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipient_id: i64,
    pub project_id: i64,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn review_requested(
        admin_id: i64,
        project_id: i64,
        title: &str,
        resubmission: bool,
    ) -> Self {
        let message = if resubmission {
            format!("Project \"{}\" was updated and awaits review", title)
        } else {
            format!("New project \"{}\" awaits review", title)
        };
        Self {
            recipient_id: admin_id,
            project_id,
            kind: NotificationKind::ReviewRequested,
            message,
        }
    }

    pub fn review_decided(
        owner_id: i64,
        project_id: i64,
        title: &str,
        status: ProjectStatus,
        comment: Option<&str>,
    ) -> Self {
        let mut message = format!("Your project \"{}\" was {}", title, status);
        if let Some(comment) = comment.filter(|c| !c.trim().is_empty()) {
            message.push_str(": ");
            message.push_str(comment.trim());
        }
        Self {
            recipient_id: owner_id,
            project_id,
            kind: NotificationKind::ReviewDecided,
            message,
        }
    }
}

/// Delivery channel for user-facing notifications
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// In-app inbox backed by the `notifications` table
pub struct InboxDispatcher {
    pool: PgPool,
}

impl InboxDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationDispatcher for InboxDispatcher {
    fn name(&self) -> &'static str {
        "inbox"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        repository::insert_notification(
            &mut *conn,
            notification.recipient_id,
            Some(notification.project_id),
            notification.kind.as_str(),
            &notification.message,
        )
        .await?;
        Ok(())
    }
}

/// POSTs each notification as JSON to an external endpoint
pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookDispatcher {
    pub fn new(url: url::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
