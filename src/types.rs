/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a stored or submitted enum value is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declared kind of a project; selects which subtype table holds its details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Coursework,
    Academic,
    Competition,
}

impl ProjectType {
    pub const ALL: [ProjectType; 3] = [
        ProjectType::Coursework,
        ProjectType::Academic,
        ProjectType::Competition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Coursework => "coursework",
            ProjectType::Academic => "academic",
            ProjectType::Competition => "competition",
        }
    }

    /// Physical table holding the subtype row for this type
    pub fn subtype_table(&self) -> &'static str {
        match self {
            ProjectType::Coursework => "courseworks",
            ProjectType::Academic => "academic_papers",
            ProjectType::Competition => "competitions",
        }
    }
}

impl TryFrom<String> for ProjectType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ProjectType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coursework" => Ok(ProjectType::Coursework),
            "academic" => Ok(ProjectType::Academic),
            "competition" => Ok(ProjectType::Competition),
            other => Err(ParseEnumError::new("project type", other)),
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Approved => "approved",
            ProjectStatus::Rejected => "rejected",
        }
    }

    /// Statuses an administrator may review a project into
    pub fn is_review_outcome(&self) -> bool {
        matches!(self, ProjectStatus::Approved | ProjectStatus::Rejected)
    }
}

impl TryFrom<String> for ProjectStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ProjectStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProjectStatus::Pending),
            "approved" => Ok(ProjectStatus::Approved),
            "rejected" => Ok(ProjectStatus::Rejected),
            other => Err(ParseEnumError::new("project status", other)),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag stored on every project file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Image,
    Video,
    Pdf,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Pdf => "pdf",
            FileCategory::Other => "other",
        }
    }
}

impl TryFrom<String> for FileCategory {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for FileCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileCategory::Image),
            "video" => Ok(FileCategory::Video),
            "pdf" => Ok(FileCategory::Pdf),
            "other" => Ok(FileCategory::Other),
            other => Err(ParseEnumError::new("file type", other)),
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_type_round_trips_through_str() {
        for ty in ProjectType::ALL {
            assert_eq!(ty.as_str().parse::<ProjectType>().unwrap(), ty);
        }
        assert!("thesis".parse::<ProjectType>().is_err());
    }

    #[test]
    fn only_terminal_statuses_are_review_outcomes() {
        assert!(!ProjectStatus::Pending.is_review_outcome());
        assert!(ProjectStatus::Approved.is_review_outcome());
        assert!(ProjectStatus::Rejected.is_review_outcome());
    }

    #[test]
    fn status_serializes_lowercase() {
        let v = serde_json::to_value(ProjectStatus::Approved).unwrap();
        assert_eq!(v, serde_json::json!("approved"));
    }
}
