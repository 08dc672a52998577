// Data-access helpers for the project aggregate.
//
// Every function takes a `&mut PgConnection` so callers decide the
// transaction boundary: pass `&mut *tx` inside a transaction, or a pooled
// connection for standalone reads.

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::database::manager::DatabaseError;
use crate::database::models::{
    AcademicPaper, AuditEntry, Competition, Coursework, ProjectDetails, ProjectFile, ProjectReview,
    ProjectRow, User,
};
use crate::services::file_binding::ColumnRef;
use crate::services::payload::{ProjectDraft, ProjectPatch, SqlValue};
use crate::types::{FileCategory, ProjectStatus, ProjectType};

const PROJECT_COLUMNS: &str = "id, title, description, type, study_year, year, semester, \
     visibility, status, tags, views_count, cover_image_id, owner_id, created_at, updated_at";

// ----------------------------------------------------------------------------
// projects
// ----------------------------------------------------------------------------

/// Insert the base row; status is always `pending` regardless of input
pub async fn insert_project(
    conn: &mut PgConnection,
    draft: &ProjectDraft,
) -> Result<i64, DatabaseError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO projects
            (title, description, type, study_year, year, semester, visibility, status, tags,
             owner_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9)
        RETURNING id
        "#,
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.project_type.as_str())
    .bind(draft.study_year)
    .bind(draft.year)
    .bind(&draft.semester)
    .bind(i32::from(draft.visibility))
    .bind(&draft.tags)
    .bind(draft.owner_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn fetch_project_row(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Option<ProjectRow>, DatabaseError> {
    let sql = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);
    let row = sqlx::query_as::<_, ProjectRow>(&sql)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Read the base row and hold its row lock until the transaction ends
pub async fn lock_project_row(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Option<ProjectRow>, DatabaseError> {
    let sql = format!("SELECT {} FROM projects WHERE id = $1 FOR UPDATE", PROJECT_COLUMNS);
    let row = sqlx::query_as::<_, ProjectRow>(&sql)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Write supplied base columns and reset the review status to `pending`
pub async fn update_project_fields(
    conn: &mut PgConnection,
    project_id: i64,
    patch: &ProjectPatch,
) -> Result<u64, DatabaseError> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE projects SET status = 'pending', updated_at = now()");

    if let Some(title) = &patch.title {
        qb.push(", title = ").push_bind(title.clone());
    }
    if let Some(description) = &patch.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(project_type) = patch.project_type {
        qb.push(", type = ").push_bind(project_type.as_str());
    }
    if let Some(study_year) = patch.study_year {
        qb.push(", study_year = ").push_bind(study_year);
    }
    if let Some(year) = patch.year {
        qb.push(", year = ").push_bind(year);
    }
    if let Some(semester) = &patch.semester {
        qb.push(", semester = ").push_bind(semester.clone());
    }
    if let Some(visibility) = patch.visibility {
        qb.push(", visibility = ").push_bind(i32::from(visibility));
    }
    if let Some(tags) = &patch.tags {
        qb.push(", tags = ").push_bind(tags.clone());
    }

    qb.push(" WHERE id = ").push_bind(project_id);

    let result = qb.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

pub async fn set_project_status(
    conn: &mut PgConnection,
    project_id: i64,
    status: ProjectStatus,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE projects SET status = $1, updated_at = now() WHERE id = $2")
        .bind(status.as_str())
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

// ----------------------------------------------------------------------------
// subtype rows
// ----------------------------------------------------------------------------

/// Insert the subtype row with the given columns (column names come from the
/// static subtype field table, never from request input)
pub async fn insert_subtype(
    conn: &mut PgConnection,
    project_id: i64,
    project_type: ProjectType,
    values: &[(&'static str, SqlValue)],
) -> Result<(), DatabaseError> {
    let head = format!("INSERT INTO {} (project_id", project_type.subtype_table());
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(head);
    for (column, _) in values {
        qb.push(", ").push(*column);
    }
    qb.push(") VALUES (").push_bind(project_id);
    for (_, value) in values {
        qb.push(", ");
        push_value(&mut qb, value);
    }
    qb.push(")");

    qb.build().execute(&mut *conn).await?;
    Ok(())
}

/// Update only the supplied subtype columns
pub async fn update_subtype(
    conn: &mut PgConnection,
    project_id: i64,
    project_type: ProjectType,
    values: &[(&'static str, SqlValue)],
) -> Result<u64, DatabaseError> {
    if values.is_empty() {
        return Ok(0);
    }

    let head = format!("UPDATE {} SET ", project_type.subtype_table());
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(head);
    for (i, (column, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*column).push(" = ");
        push_value(&mut qb, value);
    }
    qb.push(" WHERE project_id = ").push_bind(project_id);

    let result = qb.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

pub async fn subtype_exists(
    conn: &mut PgConnection,
    project_id: i64,
    project_type: ProjectType,
) -> Result<bool, DatabaseError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE project_id = $1)",
        project_type.subtype_table()
    );
    let (exists,): (bool,) = sqlx::query_as(&sql).bind(project_id).fetch_one(&mut *conn).await?;
    Ok(exists)
}

/// Remove the project's row from every subtype table except `keep`
pub async fn delete_subtypes_except(
    conn: &mut PgConnection,
    project_id: i64,
    keep: Option<ProjectType>,
) -> Result<(), DatabaseError> {
    for ty in ProjectType::ALL {
        if Some(ty) == keep {
            continue;
        }
        let sql = format!("DELETE FROM {} WHERE project_id = $1", ty.subtype_table());
        sqlx::query(&sql).bind(project_id).execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn fetch_details(
    conn: &mut PgConnection,
    project_id: i64,
    project_type: ProjectType,
) -> Result<Option<ProjectDetails>, DatabaseError> {
    let details = match project_type {
        ProjectType::Academic => sqlx::query_as::<_, AcademicPaper>(
            "SELECT abstract, authors, journal, publication_year, paper_file_id \
             FROM academic_papers WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(ProjectDetails::Academic),
        ProjectType::Competition => sqlx::query_as::<_, Competition>(
            "SELECT competition_name, level, achievement, award_date, competition_year, \
             poster_file_id FROM competitions WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(ProjectDetails::Competition),
        ProjectType::Coursework => sqlx::query_as::<_, Coursework>(
            "SELECT course_code, course_name, instructor, poster_file_id, video_file_id \
             FROM courseworks WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(ProjectDetails::Coursework),
    };
    Ok(details)
}

/// Number of subtype rows across all three tables
pub async fn count_subtype_rows(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<i64, DatabaseError> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM academic_papers WHERE project_id = $1)
             + (SELECT COUNT(*) FROM competitions WHERE project_id = $1)
             + (SELECT COUNT(*) FROM courseworks WHERE project_id = $1)
        "#,
    )
    .bind(project_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &SqlValue) {
    match value {
        SqlValue::Text(s) => {
            qb.push_bind(s.clone());
        }
        SqlValue::Int(i) => {
            qb.push_bind(*i);
        }
    }
}

// ----------------------------------------------------------------------------
// contributors
// ----------------------------------------------------------------------------

pub async fn insert_contributors(
    conn: &mut PgConnection,
    project_id: i64,
    user_ids: &[i64],
) -> Result<(), DatabaseError> {
    for user_id in user_ids {
        sqlx::query(
            "INSERT INTO project_groups (project_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(*user_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn replace_contributors(
    conn: &mut PgConnection,
    project_id: i64,
    user_ids: &[i64],
) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM project_groups WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    insert_contributors(conn, project_id, user_ids).await
}

pub async fn fetch_contributors(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Vec<i64>, DatabaseError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT user_id FROM project_groups WHERE project_id = $1 ORDER BY user_id")
            .bind(project_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// ----------------------------------------------------------------------------
// files
// ----------------------------------------------------------------------------

pub async fn insert_file(
    conn: &mut PgConnection,
    project_id: i64,
    category: FileCategory,
    file_path: &str,
    file_name: &str,
    file_size: i64,
) -> Result<i64, DatabaseError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO project_files (project_id, file_type, file_path, file_name, file_size)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(project_id)
    .bind(category.as_str())
    .bind(file_path)
    .bind(file_name)
    .bind(file_size)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Point a binding column at a stored file
pub async fn bind_file_column(
    conn: &mut PgConnection,
    column: ColumnRef,
    project_id: i64,
    file_id: i64,
) -> Result<u64, DatabaseError> {
    let sql = format!(
        "UPDATE {} SET {} = $1 WHERE {} = $2",
        column.table, column.column, column.key
    );
    let result = sqlx::query(&sql)
        .bind(file_id)
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_files(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Vec<ProjectFile>, DatabaseError> {
    let files = sqlx::query_as::<_, ProjectFile>(
        "SELECT id, project_id, file_type, file_path, file_name, file_size, created_at \
         FROM project_files WHERE project_id = $1 ORDER BY id",
    )
    .bind(project_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(files)
}

// ----------------------------------------------------------------------------
// reviews
// ----------------------------------------------------------------------------

pub async fn insert_review(
    conn: &mut PgConnection,
    project_id: i64,
    admin_id: i64,
    old_status: ProjectStatus,
    new_status: ProjectStatus,
    comment: Option<&str>,
) -> Result<ProjectReview, DatabaseError> {
    let review = sqlx::query_as::<_, ProjectReview>(
        r#"
        INSERT INTO project_reviews (project_id, admin_id, old_status, status, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, project_id, admin_id, old_status, status, comment, created_at
        "#,
    )
    .bind(project_id)
    .bind(admin_id)
    .bind(old_status.as_str())
    .bind(new_status.as_str())
    .bind(comment)
    .fetch_one(&mut *conn)
    .await?;
    Ok(review)
}

/// Review history, newest first
pub async fn fetch_reviews(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Vec<ProjectReview>, DatabaseError> {
    let reviews = sqlx::query_as::<_, ProjectReview>(
        "SELECT id, project_id, admin_id, old_status, status, comment, created_at \
         FROM project_reviews WHERE project_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(project_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(reviews)
}

// ----------------------------------------------------------------------------
// delete
// ----------------------------------------------------------------------------

/// Remove the project and everything hanging off it. Returns the storage
/// paths of the removed files so the caller can delete blobs after commit.
pub async fn delete_project_cascade(
    conn: &mut PgConnection,
    project_id: i64,
) -> Result<Vec<String>, DatabaseError> {
    let paths: Vec<(String,)> =
        sqlx::query_as("SELECT file_path FROM project_files WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(&mut *conn)
            .await?;

    delete_subtypes_except(conn, project_id, None).await?;

    sqlx::query("UPDATE projects SET cover_image_id = NULL WHERE id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;

    for table in ["project_files", "project_groups", "project_views", "project_reviews"] {
        let sql = format!("DELETE FROM {} WHERE project_id = $1", table);
        sqlx::query(&sql).bind(project_id).execute(&mut *conn).await?;
    }

    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("project {}", project_id)));
    }

    Ok(paths.into_iter().map(|(p,)| p).collect())
}

/// Count a view by someone other than the owner
pub async fn record_view(
    conn: &mut PgConnection,
    project_id: i64,
    user_id: i64,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO project_views (project_id, user_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("UPDATE projects SET views_count = views_count + 1 WHERE id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ----------------------------------------------------------------------------
// users, audit, notifications
// ----------------------------------------------------------------------------

pub async fn fetch_user(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, role, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn admin_ids(conn: &mut PgConnection) -> Result<Vec<i64>, DatabaseError> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE role = 'admin' ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn insert_audit_entry(
    conn: &mut PgConnection,
    entity: &str,
    entity_id: i64,
    field: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    actor_id: Option<i64>,
) -> Result<i64, DatabaseError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO audit_logs (entity, entity_id, field, old_value, new_value, actor_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(entity)
    .bind(entity_id)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .bind(actor_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Change history for one entity, oldest first
pub async fn fetch_audit_entries(
    conn: &mut PgConnection,
    entity: &str,
    entity_id: i64,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        "SELECT id, entity, entity_id, field, old_value, new_value, actor_id, created_at \
         FROM audit_logs WHERE entity = $1 AND entity_id = $2 ORDER BY id",
    )
    .bind(entity)
    .bind(entity_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(entries)
}

pub async fn insert_notification(
    conn: &mut PgConnection,
    recipient_id: i64,
    project_id: Option<i64>,
    kind: &str,
    message: &str,
) -> Result<i64, DatabaseError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO notifications (recipient_id, project_id, kind, message)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(recipient_id)
    .bind(project_id)
    .bind(kind)
    .bind(message)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}
