// Ring 9: Notification Observer - tells the owner how their project was reviewed

use async_trait::async_trait;
use std::sync::Arc;

use crate::observer::error::ObserverError;
use crate::observer::event::{EventKind, ProjectEvent};
use crate::observer::traits::{ObserverRing, PostCommitObserver};
use crate::services::notification::{Notification, NotificationDispatcher};

pub struct OwnerDecisionNotifier {
    dispatchers: Vec<Arc<dyn NotificationDispatcher>>,
}

impl OwnerDecisionNotifier {
    pub fn new(dispatchers: Vec<Arc<dyn NotificationDispatcher>>) -> Self {
        Self { dispatchers }
    }
}

#[async_trait]
impl PostCommitObserver for OwnerDecisionNotifier {
    fn name(&self) -> &'static str {
        "OwnerDecisionNotifier"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Notification
    }

    fn applies_to(&self, kind: EventKind) -> bool {
        kind == EventKind::Reviewed
    }

    async fn observe(&self, event: &ProjectEvent) -> Result<(), ObserverError> {
        let ProjectEvent::Reviewed {
            project_id,
            title,
            owner_id,
            new_status,
            comment,
            ..
        } = event
        else {
            return Ok(());
        };

        let notification = Notification::review_decided(
            *owner_id,
            *project_id,
            title,
            *new_status,
            comment.as_deref(),
        );

        let mut last_error = None;
        for dispatcher in &self.dispatchers {
            if let Err(e) = dispatcher.dispatch(&notification).await {
                tracing::warn!(
                    dispatcher = dispatcher.name(),
                    owner_id,
                    error = %e,
                    "owner notification failed"
                );
                last_error = Some(e);
            }
        }

        match last_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
