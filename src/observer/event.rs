use serde::Serialize;

use crate::types::ProjectStatus;

/// Committed state change handed to post-commit observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProjectEvent {
    /// Project created, or updated and reset to pending
    Submitted {
        project_id: i64,
        title: String,
        owner_id: i64,
        actor_id: i64,
        old_status: Option<ProjectStatus>,
        resubmission: bool,
    },
    /// Administrator decision committed
    Reviewed {
        project_id: i64,
        title: String,
        owner_id: i64,
        reviewer_id: i64,
        old_status: ProjectStatus,
        new_status: ProjectStatus,
        comment: Option<String>,
    },
}

/// Discriminant used by observers to select events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Submitted,
    Reviewed,
}

impl ProjectEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProjectEvent::Submitted { .. } => EventKind::Submitted,
            ProjectEvent::Reviewed { .. } => EventKind::Reviewed,
        }
    }

    pub fn project_id(&self) -> i64 {
        match self {
            ProjectEvent::Submitted { project_id, .. }
            | ProjectEvent::Reviewed { project_id, .. } => *project_id,
        }
    }
}
