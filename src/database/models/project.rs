use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{ProjectStatus, ProjectType};

/// Base `projects` row as stored
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "type", try_from = "String")]
    pub project_type: ProjectType,
    pub study_year: i32,
    pub year: i32,
    pub semester: String,
    pub visibility: i32,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub tags: String,
    pub views_count: i64,
    pub cover_image_id: Option<i64>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `academic_papers` subtype row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AcademicPaper {
    #[serde(rename = "abstract")]
    #[sqlx(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub journal: String,
    pub publication_year: i32,
    pub paper_file_id: Option<i64>,
}

/// `competitions` subtype row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Competition {
    pub competition_name: String,
    pub level: String,
    pub achievement: String,
    pub award_date: String,
    pub competition_year: i32,
    pub poster_file_id: Option<i64>,
}

/// `courseworks` subtype row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Coursework {
    pub course_code: String,
    pub course_name: String,
    pub instructor: String,
    pub poster_file_id: Option<i64>,
    pub video_file_id: Option<i64>,
}

/// Type-specific payload; the variant is the project's `type` discriminant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum ProjectDetails {
    Coursework(Coursework),
    Academic(AcademicPaper),
    Competition(Competition),
}

impl ProjectDetails {
    pub fn project_type(&self) -> ProjectType {
        match self {
            ProjectDetails::Coursework(_) => ProjectType::Coursework,
            ProjectDetails::Academic(_) => ProjectType::Academic,
            ProjectDetails::Competition(_) => ProjectType::Competition,
        }
    }
}

/// Project aggregate: common columns plus exactly one subtype payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub study_year: i32,
    pub year: i32,
    pub semester: String,
    pub visibility: bool,
    pub status: ProjectStatus,
    pub tags: String,
    pub views_count: i64,
    pub cover_image_id: Option<i64>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ProjectDetails,
}

impl Project {
    pub fn from_parts(row: ProjectRow, details: ProjectDetails) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            study_year: row.study_year,
            year: row.year,
            semester: row.semester,
            visibility: row.visibility != 0,
            status: row.status,
            tags: row.tags,
            views_count: row.views_count,
            cover_image_id: row.cover_image_id,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            details,
        }
    }

    pub fn project_type(&self) -> ProjectType {
        self.details.project_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_serialize_with_type_tag() {
        let details = ProjectDetails::Academic(AcademicPaper {
            abstract_text: "On graphs".into(),
            publication_year: 2024,
            ..Default::default()
        });
        let v = serde_json::to_value(&details).unwrap();
        assert_eq!(v["type"], "academic");
        assert_eq!(v["details"]["abstract"], "On graphs");
        assert_eq!(details.project_type(), ProjectType::Academic);
    }
}
