// Project submission write path: create, update, delete and read of the
// project aggregate. Every mutation runs in one transaction; uploads are
// stored before it opens and removed again if it rolls back.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::models::{Project, ProjectFile, ProjectReview};
use crate::database::repository;
use crate::observer::{ObserverPipeline, ProjectEvent};
use crate::services::file_binding::{bind, classify};
use crate::services::payload::{
    complete_subtype, normalize_contributors, FieldErrors, IncomingFile, ProjectDraft, ProjectForm,
    ProjectPatch,
};
use crate::services::storage::{StorageGateway, StoredObject};
use crate::services::{Actor, ServiceError};
use crate::types::{ProjectStatus, ProjectType};

const PENDING_MESSAGE: &str = "Project submitted and pending approval";

/// Returned after a successful create or update
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub id: i64,
    pub title: String,
    pub status: ProjectStatus,
    pub message: &'static str,
}

/// Project with everything that hangs off it
#[derive(Debug, Clone, Serialize)]
pub struct ProjectAggregate {
    #[serde(flatten)]
    pub project: Project,
    pub contributors: Vec<i64>,
    pub files: Vec<ProjectFile>,
    pub reviews: Vec<ProjectReview>,
}

/// An upload that already sits in storage, waiting for its database row
#[derive(Debug, Clone)]
struct StoredUpload {
    field_name: String,
    file_name: String,
    content_type: String,
    object: StoredObject,
}

pub struct ProjectWriteService {
    pool: PgPool,
    storage: Arc<dyn StorageGateway>,
    observers: ObserverPipeline,
    max_file_size: u64,
}

impl ProjectWriteService {
    pub fn new(
        pool: PgPool,
        storage: Arc<dyn StorageGateway>,
        observers: ObserverPipeline,
        max_file_size: u64,
    ) -> Self {
        Self {
            pool,
            storage,
            observers,
            max_file_size,
        }
    }

    /// Create a project with its subtype row, contributors and files
    pub async fn create_project(
        &self,
        owner_id: i64,
        actor: &Actor,
        form: ProjectForm,
    ) -> Result<SubmissionReceipt, ServiceError> {
        if !actor.can_act_for(owner_id) {
            return Err(ServiceError::Forbidden(
                "Projects can only be created by their owner or an administrator".into(),
            ));
        }

        let draft =
            ProjectDraft::from_fields(owner_id, &form.fields).map_err(ServiceError::Validation)?;
        self.check_file_sizes(&form.files)?;

        let uploads = self.store_uploads(&form.files).await?;

        let project_id = match self.create_in_transaction(&draft, &uploads).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(owner_id, error = %e, "project creation rolled back");
                self.discard_uploads(&uploads).await;
                return Err(e);
            }
        };

        tracing::info!(
            project_id,
            owner_id,
            project_type = %draft.project_type,
            files = uploads.len(),
            "project created"
        );

        self.observers.dispatch(ProjectEvent::Submitted {
            project_id,
            title: draft.title.clone(),
            owner_id,
            actor_id: actor.user_id,
            old_status: None,
            resubmission: false,
        });

        Ok(SubmissionReceipt {
            id: project_id,
            title: draft.title,
            status: ProjectStatus::Pending,
            message: PENDING_MESSAGE,
        })
    }

    async fn create_in_transaction(
        &self,
        draft: &ProjectDraft,
        uploads: &[StoredUpload],
    ) -> Result<i64, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let project_id = repository::insert_project(&mut *tx, draft).await?;
        repository::insert_contributors(&mut *tx, project_id, &draft.contributors).await?;
        repository::insert_subtype(&mut *tx, project_id, draft.project_type, &draft.subtype).await?;
        attach_uploads(&mut *tx, project_id, draft.project_type, uploads).await?;

        tx.commit().await?;
        Ok(project_id)
    }

    /// Apply a partial update and send the project back to review
    pub async fn update_project_with_files(
        &self,
        project_id: i64,
        actor: &Actor,
        form: ProjectForm,
    ) -> Result<SubmissionReceipt, ServiceError> {
        let patch = ProjectPatch::from_fields(&form.fields).map_err(ServiceError::Validation)?;
        self.check_file_sizes(&form.files)?;

        // reject strangers before anything touches storage
        {
            let mut conn = self.pool.acquire().await?;
            let row = repository::fetch_project_row(&mut *conn, project_id)
                .await?
                .ok_or_else(|| not_found(project_id))?;
            if !actor.can_act_for(row.owner_id) {
                return Err(forbidden_edit());
            }
        }

        let uploads = self.store_uploads(&form.files).await?;

        let updated = self
            .update_in_transaction(project_id, actor, &patch, &uploads)
            .await;
        let (owner_id, old_status, title) = match updated {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(project_id, error = %e, "project update rolled back");
                self.discard_uploads(&uploads).await;
                return Err(e);
            }
        };

        tracing::info!(
            project_id,
            actor_id = actor.user_id,
            old_status = %old_status,
            "project updated, awaiting review"
        );

        self.observers.dispatch(ProjectEvent::Submitted {
            project_id,
            title: title.clone(),
            owner_id,
            actor_id: actor.user_id,
            old_status: Some(old_status),
            resubmission: true,
        });

        Ok(SubmissionReceipt {
            id: project_id,
            title,
            status: ProjectStatus::Pending,
            message: PENDING_MESSAGE,
        })
    }

    async fn update_in_transaction(
        &self,
        project_id: i64,
        actor: &Actor,
        patch: &ProjectPatch,
        uploads: &[StoredUpload],
    ) -> Result<(i64, ProjectStatus, String), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let row = repository::lock_project_row(&mut *tx, project_id)
            .await?
            .ok_or_else(|| not_found(project_id))?;
        if !actor.can_act_for(row.owner_id) {
            return Err(forbidden_edit());
        }

        let target_type = patch.project_type.unwrap_or(row.project_type);
        if target_type != row.project_type {
            tracing::debug!(
                project_id,
                from = %row.project_type,
                to = %target_type,
                "project type changed"
            );
            repository::delete_subtypes_except(&mut *tx, project_id, Some(target_type)).await?;
        }

        repository::update_project_fields(&mut *tx, project_id, patch).await?;

        if let Some(contributors) = &patch.contributors {
            let contributors = normalize_contributors(contributors.clone(), row.owner_id);
            repository::replace_contributors(&mut *tx, project_id, &contributors).await?;
        }

        let supplied = patch.subtype_for(target_type);
        if repository::subtype_exists(&mut *tx, project_id, target_type).await? {
            repository::update_subtype(&mut *tx, project_id, target_type, &supplied).await?;
        } else {
            let year = patch.year.unwrap_or(row.year);
            let values = complete_subtype(target_type, &supplied, year);
            repository::insert_subtype(&mut *tx, project_id, target_type, &values).await?;
        }

        attach_uploads(&mut *tx, project_id, target_type, uploads).await?;

        tx.commit().await?;

        let title = patch.title.clone().unwrap_or(row.title);
        Ok((row.owner_id, row.status, title))
    }

    /// Remove the project and its dependents; blobs go only after commit
    pub async fn delete_project(&self, project_id: i64, actor: &Actor) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let row = repository::lock_project_row(&mut *tx, project_id)
            .await?
            .ok_or_else(|| not_found(project_id))?;
        if !actor.can_act_for(row.owner_id) {
            return Err(ServiceError::Forbidden(
                "Only the owner or an administrator can delete this project".into(),
            ));
        }

        let paths = repository::delete_project_cascade(&mut *tx, project_id).await?;
        tx.commit().await?;

        tracing::info!(
            project_id,
            actor_id = actor.user_id,
            files = paths.len(),
            "project deleted"
        );

        for path in paths {
            if let Err(e) = self.storage.delete(&path).await {
                tracing::warn!(
                    project_id,
                    path = %path,
                    error = %e,
                    "failed to remove stored file"
                );
            }
        }
        Ok(())
    }

    /// Load the aggregate. Unapproved or hidden projects are only shown to
    /// their owner, contributors and administrators.
    pub async fn get_project(
        &self,
        project_id: i64,
        actor: &Actor,
    ) -> Result<ProjectAggregate, ServiceError> {
        let mut conn = self.pool.acquire().await?;

        let row = repository::fetch_project_row(&mut *conn, project_id)
            .await?
            .ok_or_else(|| not_found(project_id))?;
        let contributors = repository::fetch_contributors(&mut *conn, project_id).await?;

        let public = row.status == ProjectStatus::Approved && row.visibility != 0;
        let involved = actor.can_act_for(row.owner_id) || contributors.contains(&actor.user_id);
        if !public && !involved {
            // indistinguishable from a missing project
            return Err(not_found(project_id));
        }

        let details = repository::fetch_details(&mut *conn, project_id, row.project_type)
            .await?
            .ok_or_else(|| {
                ServiceError::Database(DatabaseError::QueryError(format!(
                    "project {} has no {} row",
                    project_id,
                    row.project_type.subtype_table()
                )))
            })?;
        let files = repository::fetch_files(&mut *conn, project_id).await?;
        let reviews = repository::fetch_reviews(&mut *conn, project_id).await?;

        if actor.user_id != row.owner_id {
            if let Err(e) = repository::record_view(&mut *conn, project_id, actor.user_id).await {
                tracing::debug!(project_id, error = %e, "view not recorded");
            }
        }

        Ok(ProjectAggregate {
            project: Project::from_parts(row, details),
            contributors,
            files,
            reviews,
        })
    }

    fn check_file_sizes(&self, files: &[IncomingFile]) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        for file in files {
            if file.data.len() as u64 > self.max_file_size {
                errors.insert(
                    file.field_name.clone(),
                    format!("File exceeds the maximum size of {} bytes", self.max_file_size),
                );
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(errors))
        }
    }

    async fn store_uploads(
        &self,
        files: &[IncomingFile],
    ) -> Result<Vec<StoredUpload>, ServiceError> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.storage.upload(&file.file_name, &file.content_type, &file.data).await {
                Ok(object) => stored.push(StoredUpload {
                    field_name: file.field_name.clone(),
                    file_name: file.file_name.clone(),
                    content_type: file.content_type.clone(),
                    object,
                }),
                Err(e) => {
                    tracing::error!(field = %file.field_name, error = %e, "upload failed");
                    self.discard_uploads(&stored).await;
                    return Err(e.into());
                }
            }
        }
        Ok(stored)
    }

    /// Compensate for a rolled-back transaction; failures are only logged
    async fn discard_uploads(&self, uploads: &[StoredUpload]) {
        for upload in uploads {
            if let Err(e) = self.storage.delete(&upload.object.path).await {
                tracing::warn!(
                    path = %upload.object.path,
                    error = %e,
                    "failed to discard orphaned upload"
                );
            }
        }
    }
}

/// Insert a file row per upload and point any matching slot column at it
async fn attach_uploads(
    conn: &mut PgConnection,
    project_id: i64,
    project_type: ProjectType,
    uploads: &[StoredUpload],
) -> Result<(), ServiceError> {
    for upload in uploads {
        let category = classify(&upload.content_type);
        let file_id = repository::insert_file(
            &mut *conn,
            project_id,
            category,
            &upload.object.path,
            &upload.file_name,
            upload.object.size as i64,
        )
        .await?;

        match bind(&upload.field_name, project_type, category) {
            Some(target) => {
                repository::bind_file_column(&mut *conn, target.column(), project_id, file_id)
                    .await?;
                tracing::debug!(
                    project_id,
                    file_id,
                    field = %upload.field_name,
                    target = ?target,
                    "file bound"
                );
            }
            None => {
                tracing::debug!(
                    project_id,
                    file_id,
                    field = %upload.field_name,
                    "stored as plain file"
                );
            }
        }
    }
    Ok(())
}

fn not_found(project_id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Project {} not found", project_id))
}

fn forbidden_edit() -> ServiceError {
    ServiceError::Forbidden("Only the owner or an administrator can edit this project".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::{StorageError, StorageUsage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<HashMap<String, usize>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl StorageGateway for MemoryStorage {
        async fn upload(
            &self,
            file_name: &str,
            _content_type: &str,
            data: &[u8],
        ) -> Result<StoredObject, StorageError> {
            let mut objects = self.objects.lock().unwrap();
            if self.fail_after.is_some_and(|n| objects.len() >= n) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            let path = format!("mem/{}", file_name);
            objects.insert(path.clone(), data.len());
            Ok(StoredObject { path, size: data.len() as u64 })
        }

        async fn delete(&self, path: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }

        async fn usage(&self) -> Result<StorageUsage, StorageError> {
            let objects = self.objects.lock().unwrap();
            Ok(StorageUsage {
                files: objects.len() as u64,
                bytes: objects.values().sum::<usize>() as u64,
            })
        }
    }

    fn service(storage: Arc<MemoryStorage>, max_file_size: u64) -> ProjectWriteService {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unused")
            .unwrap();
        ProjectWriteService::new(pool, storage, ObserverPipeline::new(), max_file_size)
    }

    fn file(field: &str, name: &str, len: usize) -> IncomingFile {
        IncomingFile {
            field_name: field.into(),
            file_name: name.into(),
            content_type: "image/png".into(),
            data: vec![0; len],
        }
    }

    #[tokio::test]
    async fn oversized_files_are_field_errors() {
        let svc = service(Arc::new(MemoryStorage::default()), 10);
        let err = svc
            .check_file_sizes(&[file("cover_image", "a.png", 11), file("poster", "b.png", 10)])
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                assert!(errors.contains_key("cover_image"));
                assert!(!errors.contains_key("poster"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn partial_upload_failure_removes_stored_blobs() {
        let storage = Arc::new(MemoryStorage {
            fail_after: Some(1),
            ..Default::default()
        });
        let svc = service(storage.clone(), 1024);

        let result = svc
            .store_uploads(&[file("cover_image", "a.png", 3), file("poster", "b.png", 3)])
            .await;
        assert!(matches!(result, Err(ServiceError::Storage(_))));
        assert_eq!(storage.usage().await.unwrap().files, 0);
    }

    #[tokio::test]
    async fn strangers_cannot_create_for_someone_else() {
        let svc = service(Arc::new(MemoryStorage::default()), 1024);
        let stranger = Actor::new(2, crate::types::Role::Student);
        let err = svc.create_project(1, &stranger, ProjectForm::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn invalid_payload_fails_before_storage() {
        let storage = Arc::new(MemoryStorage::default());
        let svc = service(storage.clone(), 1024);
        let owner = Actor::new(1, crate::types::Role::Student);
        let form = ProjectForm {
            fields: HashMap::from([("title".to_string(), "Only a title".to_string())]),
            files: vec![file("cover_image", "a.png", 3)],
        };

        let err = svc.create_project(1, &owner, form).await.unwrap_err();
        match err {
            ServiceError::Validation(errors) => assert!(errors.contains_key("description")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(storage.usage().await.unwrap().files, 0);
    }
}
