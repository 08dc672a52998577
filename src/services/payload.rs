// Submission payload parsing and validation.
//
// Both write paths receive the same flat set of named text fields (multipart
// form parts). Common project columns are parsed here; type-specific columns
// come from SUBTYPE_FIELDS so each subtype table is described once.

use std::collections::HashMap;

use crate::types::ProjectType;

/// Field name -> message, surfaced as `field_errors` in the API response
pub type FieldErrors = HashMap<String, String>;

/// A value destined for a subtype column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i32),
}

/// How a subtype column is filled when the submitter leaves it out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, defaults to empty string
    Text,
    /// Integer year, defaults to the project's `year`
    Year,
}

#[derive(Debug, Clone, Copy)]
pub struct SubtypeField {
    pub project_type: ProjectType,
    /// Form field name and column name (they are identical)
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(project_type: ProjectType, name: &'static str, kind: FieldKind) -> SubtypeField {
    SubtypeField { project_type, name, kind }
}

/// Writable subtype columns per project type
pub const SUBTYPE_FIELDS: &[SubtypeField] = &[
    field(ProjectType::Coursework, "course_code", FieldKind::Text),
    field(ProjectType::Coursework, "course_name", FieldKind::Text),
    field(ProjectType::Coursework, "instructor", FieldKind::Text),
    field(ProjectType::Academic, "abstract", FieldKind::Text),
    field(ProjectType::Academic, "authors", FieldKind::Text),
    field(ProjectType::Academic, "journal", FieldKind::Text),
    field(ProjectType::Academic, "publication_year", FieldKind::Year),
    field(ProjectType::Competition, "competition_name", FieldKind::Text),
    field(ProjectType::Competition, "level", FieldKind::Text),
    field(ProjectType::Competition, "achievement", FieldKind::Text),
    field(ProjectType::Competition, "award_date", FieldKind::Text),
    field(ProjectType::Competition, "competition_year", FieldKind::Year),
];

pub fn subtype_fields(project_type: ProjectType) -> impl Iterator<Item = &'static SubtypeField> {
    SUBTYPE_FIELDS.iter().filter(move |f| f.project_type == project_type)
}

/// One file part received with a submission
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Decoded multipart body shared by create and update
#[derive(Debug, Clone, Default)]
pub struct ProjectForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<IncomingFile>,
}

/// Validated input for creating a project
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub project_type: ProjectType,
    pub study_year: i32,
    pub year: i32,
    pub semester: String,
    pub visibility: bool,
    pub tags: String,
    pub contributors: Vec<i64>,
    /// Every column of the subtype table, missing ones defaulted
    pub subtype: Vec<(&'static str, SqlValue)>,
}

/// Validated input for a partial update; `None` means "leave unchanged"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_type: Option<ProjectType>,
    pub study_year: Option<i32>,
    pub year: Option<i32>,
    pub semester: Option<String>,
    pub visibility: Option<bool>,
    pub tags: Option<String>,
    pub contributors: Option<Vec<i64>>,
    /// Supplied subtype values for any type; filtered by `subtype_for`
    pub subtype: Vec<(&'static str, SqlValue)>,
}

const REQUIRED: &str = "This field is required";

impl ProjectDraft {
    pub fn from_fields(
        owner_id: i64,
        fields: &HashMap<String, String>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        if owner_id <= 0 {
            errors.insert("owner_id".into(), REQUIRED.into());
        }

        let title = required_text(fields, "title", &mut errors);
        let description = required_text(fields, "description", &mut errors);
        let semester = required_text(fields, "semester", &mut errors);
        let project_type = match text(fields, "type") {
            Some(raw) => parse_type(raw, &mut errors),
            None => {
                errors.insert("type".into(), REQUIRED.into());
                None
            }
        };
        let study_year = required_int(fields, "study_year", &mut errors);
        let year = required_int(fields, "year", &mut errors);
        let visibility = parse_visibility(fields, &mut errors).unwrap_or(true);
        let contributors = parse_contributors(fields, &mut errors).unwrap_or_default();
        let supplied = parse_subtype_values(fields, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        // All required values are present once no errors were collected
        let (
            Some(title),
            Some(description),
            Some(semester),
            Some(project_type),
            Some(study_year),
            Some(year),
        ) = (title, description, semester, project_type, study_year, year)
        else {
            return Err(errors);
        };

        let subtype = complete_subtype(project_type, &supplied, year);

        Ok(Self {
            owner_id,
            title,
            description,
            project_type,
            study_year,
            year,
            semester,
            visibility,
            tags: text(fields, "tags").unwrap_or_default().to_string(),
            contributors: normalize_contributors(contributors, owner_id),
            subtype,
        })
    }
}

impl ProjectPatch {
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let non_empty = |name: &str, errors: &mut FieldErrors| -> Option<String> {
            let raw = fields.get(name)?;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                errors.insert(name.into(), "This field cannot be empty".into());
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        let title = non_empty("title", &mut errors);
        let description = non_empty("description", &mut errors);
        let semester = non_empty("semester", &mut errors);
        let project_type = text(fields, "type").and_then(|raw| parse_type(raw, &mut errors));
        let study_year = optional_int(fields, "study_year", &mut errors);
        let year = optional_int(fields, "year", &mut errors);
        let visibility = parse_visibility(fields, &mut errors);
        let contributors = parse_contributors(fields, &mut errors);
        let subtype = parse_subtype_values(fields, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            title,
            description,
            project_type,
            study_year,
            year,
            semester,
            visibility,
            tags: fields.get("tags").map(|t| t.trim().to_string()),
            contributors,
            subtype,
        })
    }

    /// Supplied subtype values that belong to `project_type`
    pub fn subtype_for(&self, project_type: ProjectType) -> Vec<(&'static str, SqlValue)> {
        self.subtype
            .iter()
            .filter(|(name, _)| subtype_fields(project_type).any(|f| f.name == *name))
            .cloned()
            .collect()
    }
}

/// Fill every column of `project_type`'s subtype table, preferring supplied values
pub fn complete_subtype(
    project_type: ProjectType,
    supplied: &[(&'static str, SqlValue)],
    year: i32,
) -> Vec<(&'static str, SqlValue)> {
    subtype_fields(project_type)
        .map(|f| {
            let value = supplied
                .iter()
                .find(|(name, _)| *name == f.name)
                .map(|(_, v)| v.clone())
                .unwrap_or(match f.kind {
                    FieldKind::Text => SqlValue::Text(String::new()),
                    FieldKind::Year => SqlValue::Int(year),
                });
            (f.name, value)
        })
        .collect()
}

/// Drop the owner and duplicates while keeping submission order
pub fn normalize_contributors(ids: Vec<i64>, owner_id: i64) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if id != owner_id && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn text<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn required_text(
    fields: &HashMap<String, String>,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match text(fields, name) {
        Some(v) => Some(v.to_string()),
        None => {
            errors.insert(name.into(), REQUIRED.into());
            None
        }
    }
}

fn parse_int(raw: &str, name: &str, errors: &mut FieldErrors) -> Option<i32> {
    match raw.parse::<i32>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.insert(name.into(), format!("Expected a whole number, got '{}'", raw));
            None
        }
    }
}

fn required_int(
    fields: &HashMap<String, String>,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<i32> {
    match text(fields, name) {
        Some(raw) => parse_int(raw, name, errors),
        None => {
            errors.insert(name.into(), REQUIRED.into());
            None
        }
    }
}

fn optional_int(
    fields: &HashMap<String, String>,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<i32> {
    text(fields, name).and_then(|raw| parse_int(raw, name, errors))
}

fn parse_type(raw: &str, errors: &mut FieldErrors) -> Option<ProjectType> {
    match raw.parse::<ProjectType>() {
        Ok(ty) => Some(ty),
        Err(_) => {
            errors.insert(
                "type".into(),
                "Must be one of: coursework, academic, competition".into(),
            );
            None
        }
    }
}

fn parse_visibility(fields: &HashMap<String, String>, errors: &mut FieldErrors) -> Option<bool> {
    let raw = text(fields, "visibility")?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "public" => Some(true),
        "0" | "false" | "private" => Some(false),
        _ => {
            errors.insert("visibility".into(), "Must be 0 or 1".into());
            None
        }
    }
}

/// Accepts a JSON array (`[3, 4]`) or a comma separated list (`3,4`)
fn parse_contributors(
    fields: &HashMap<String, String>,
    errors: &mut FieldErrors,
) -> Option<Vec<i64>> {
    let raw = fields.get("contributors")?.trim();
    if raw.is_empty() {
        return Some(Vec::new());
    }

    let parsed: Result<Vec<i64>, ()> = if raw.starts_with('[') {
        serde_json::from_str::<Vec<serde_json::Value>>(raw)
            .map_err(|_| ())
            .and_then(|values| {
                values
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::Number(n) => n.as_i64().ok_or(()),
                        serde_json::Value::String(s) => s.trim().parse().map_err(|_| ()),
                        _ => Err(()),
                    })
                    .collect()
            })
    } else {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>().map_err(|_| ()))
            .collect()
    };

    match parsed {
        Ok(ids) if ids.iter().all(|id| *id > 0) => Some(ids),
        _ => {
            errors.insert("contributors".into(), "Expected a list of user ids".into());
            None
        }
    }
}

/// Parse every recognised subtype field that was supplied, for any type
fn parse_subtype_values(
    fields: &HashMap<String, String>,
    errors: &mut FieldErrors,
) -> Vec<(&'static str, SqlValue)> {
    let mut out: Vec<(&'static str, SqlValue)> = Vec::new();
    for f in SUBTYPE_FIELDS {
        if out.iter().any(|(name, _)| *name == f.name) {
            continue;
        }
        let Some(raw) = fields.get(f.name) else { continue };
        match f.kind {
            FieldKind::Text => out.push((f.name, SqlValue::Text(raw.trim().to_string()))),
            FieldKind::Year => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(v) = parse_int(trimmed, f.name, errors) {
                    out.push((f.name, SqlValue::Int(v)));
                }
            }
        }
    }
    out
}
