// File category classification and upload-slot binding.
//
// A slot is a well-known multipart field name that, for a matching file
// category and project type, points a foreign-key column at the stored file.
// Adding a slot means adding a row to BINDING_SLOTS.

use serde::Serialize;

use crate::types::{FileCategory, ProjectType};

/// Column that references a bound file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub table: &'static str,
    pub column: &'static str,
    /// Column identifying the row for a given project id
    pub key: &'static str,
}

/// Foreign-key columns an upload can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingTarget {
    ProjectCoverImage,
    AcademicPaperFile,
    CompetitionPoster,
    CourseworkPoster,
    CourseworkVideo,
}

impl BindingTarget {
    pub fn column(&self) -> ColumnRef {
        let (table, column, key) = match self {
            BindingTarget::ProjectCoverImage => ("projects", "cover_image_id", "id"),
            BindingTarget::AcademicPaperFile => ("academic_papers", "paper_file_id", "project_id"),
            BindingTarget::CompetitionPoster => ("competitions", "poster_file_id", "project_id"),
            BindingTarget::CourseworkPoster => ("courseworks", "poster_file_id", "project_id"),
            BindingTarget::CourseworkVideo => ("courseworks", "video_file_id", "project_id"),
        };
        ColumnRef { table, column, key }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BindingSlot {
    pub field_name: &'static str,
    pub category: FileCategory,
    /// `None` matches every project type
    pub project_type: Option<ProjectType>,
    pub target: BindingTarget,
}

const fn slot(
    field_name: &'static str,
    category: FileCategory,
    project_type: Option<ProjectType>,
    target: BindingTarget,
) -> BindingSlot {
    BindingSlot {
        field_name,
        category,
        project_type,
        target,
    }
}

pub const BINDING_SLOTS: &[BindingSlot] = &[
    slot(
        "cover_image",
        FileCategory::Image,
        None,
        BindingTarget::ProjectCoverImage,
    ),
    slot(
        "paper_file",
        FileCategory::Pdf,
        Some(ProjectType::Academic),
        BindingTarget::AcademicPaperFile,
    ),
    slot(
        "poster",
        FileCategory::Image,
        Some(ProjectType::Competition),
        BindingTarget::CompetitionPoster,
    ),
    slot(
        "poster",
        FileCategory::Image,
        Some(ProjectType::Coursework),
        BindingTarget::CourseworkPoster,
    ),
    slot(
        "video",
        FileCategory::Video,
        Some(ProjectType::Coursework),
        BindingTarget::CourseworkVideo,
    ),
];

/// Category tag for a MIME type
pub fn classify(mime_type: &str) -> FileCategory {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if essence.starts_with("image/") {
        FileCategory::Image
    } else if essence.starts_with("video/") {
        FileCategory::Video
    } else if essence == "application/pdf" {
        FileCategory::Pdf
    } else {
        FileCategory::Other
    }
}

/// Column to point at the stored file, if the field is a recognised slot for
/// this category and project type. Unmatched uploads are still stored as
/// plain project files by the caller.
pub fn bind(
    field_name: &str,
    project_type: ProjectType,
    category: FileCategory,
) -> Option<BindingTarget> {
    BINDING_SLOTS
        .iter()
        .find(|s| {
            s.field_name == field_name
                && s.category == category
                && s.project_type.map_or(true, |t| t == project_type)
        })
        .map(|s| s.target)
}
