pub mod project;
pub mod project_file;
pub mod review;
pub mod user;

pub use project::{
    AcademicPaper, Competition, Coursework, Project, ProjectDetails, ProjectRow,
};
pub use project_file::ProjectFile;
pub use review::{AuditEntry, ProjectReview};
pub use user::User;
