// Observer implementations organized by rings

// Ring 7: Audit - change tracking
#[path = "7/audit_log.rs"]
pub mod audit_log;

// Ring 9: Notification - user notifications
#[path = "9/notify_admins.rs"]
pub mod notify_admins;
#[path = "9/notify_owner.rs"]
pub mod notify_owner;

pub use audit_log::AuditLogObserver;
pub use notify_admins::AdminReviewNotifier;
pub use notify_owner::OwnerDecisionNotifier;
