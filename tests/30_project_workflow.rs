// End-to-end submission and review against a real database. Every test
// skips when DATABASE_URL is unset or unreachable.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;

use showcase_api::database::models::ProjectDetails;
use showcase_api::database::{repository, RetryPolicy};
use showcase_api::observer::{self, ObserverPipeline};
use showcase_api::services::{
    Actor, InboxDispatcher, LocalStorage, NotificationDispatcher, ProjectWriteService,
    ReviewWorkflow, ServiceError, StorageGateway,
};
use showcase_api::types::{ProjectStatus, ProjectType, Role};

const MAX_FILE: u64 = 1024 * 1024;

struct Harness {
    pool: PgPool,
    storage: Arc<LocalStorage>,
    root: PathBuf,
    observers: ObserverPipeline,
    projects: ProjectWriteService,
    reviews: ReviewWorkflow,
    owner: Actor,
    admin: Actor,
}

impl Harness {
    async fn new(pool: PgPool) -> Result<Self> {
        let (storage, root) = common::temp_storage();
        let dispatchers: Vec<Arc<dyn NotificationDispatcher>> =
            vec![Arc::new(InboxDispatcher::new(pool.clone()))];
        let observers =
            observer::default_pipeline(pool.clone(), dispatchers, Duration::from_secs(5));

        let projects = ProjectWriteService::new(
            pool.clone(),
            storage.clone() as Arc<dyn StorageGateway>,
            observers.clone(),
            MAX_FILE,
        );
        let reviews = ReviewWorkflow::new(
            pool.clone(),
            RetryPolicy::default(),
            Duration::from_secs(2),
            observers.clone(),
        );

        let owner = Actor::new(common::create_user(&pool, "student").await?, Role::Student);
        let admin = Actor::new(common::create_user(&pool, "admin").await?, Role::Admin);

        Ok(Self {
            pool,
            storage,
            root,
            observers,
            projects,
            reviews,
            owner,
            admin,
        })
    }

    async fn submit(&self, project_type: &str, title: &str) -> Result<i64> {
        let form = common::form_of(common::base_fields(project_type, title));
        let receipt = self.projects.create_project(self.owner.user_id, &self.owner, form).await?;
        Ok(receipt.id)
    }

    async fn reviews_for(&self, project_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM project_reviews WHERE project_id = $1";
        common::count(&self.pool, sql, project_id).await
    }

    async fn subtype_rows(&self, project_id: i64) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Ok(repository::count_subtype_rows(&mut *conn, project_id).await?)
    }

    async fn contributors_of(&self, project_id: i64) -> Result<Vec<i64>> {
        Ok(self.projects.get_project(project_id, &self.owner).await?.contributors)
    }

    async fn status_of(&self, project_id: i64) -> Result<ProjectStatus> {
        let (status,): (String,) = sqlx::query_as("SELECT status FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(status.parse()?)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

macro_rules! harness_or_skip {
    () => {
        match common::test_pool().await {
            Some(pool) => Harness::new(pool).await?,
            None => return Ok(()),
        }
    };
}

#[tokio::test]
async fn submit_approve_then_reapprove_conflicts() -> Result<()> {
    let h = harness_or_skip!();

    let mut fields = common::base_fields("coursework", "Demo");
    fields.push(("course_code", "CS101".to_string()));
    let receipt = h
        .projects
        .create_project(h.owner.user_id, &h.owner, common::form_of(fields))
        .await?;
    assert_eq!(receipt.status, ProjectStatus::Pending);
    assert_eq!(receipt.message, "Project submitted and pending approval");
    assert_eq!(h.subtype_rows(receipt.id).await?, 1);
    let files_sql = "SELECT COUNT(*) FROM project_files WHERE project_id = $1";
    assert_eq!(common::count(&h.pool, files_sql, receipt.id).await?, 0);

    let outcome = h
        .reviews
        .review_project(receipt.id, &h.admin, ProjectStatus::Approved, Some("  ok ".into()))
        .await?;
    assert_eq!(outcome.old_status, ProjectStatus::Pending);
    assert_eq!(outcome.new_status, ProjectStatus::Approved);
    assert_eq!(outcome.comment.as_deref(), Some("ok"));
    assert_eq!(outcome.review.old_status, ProjectStatus::Pending);
    assert_eq!(outcome.review.status, ProjectStatus::Approved);

    let again = h
        .reviews
        .review_project(receipt.id, &h.admin, ProjectStatus::Approved, None)
        .await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));
    assert_eq!(h.reviews_for(receipt.id).await?, 1);

    let history = h.reviews.review_history(receipt.id).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].admin_id, h.admin.user_id);
    Ok(())
}

#[tokio::test]
async fn pdf_binds_to_academic_paper_only() -> Result<()> {
    let h = harness_or_skip!();

    let mut academic = common::form_of(common::base_fields("academic", "Paper"));
    academic.files.push(common::upload("paper_file", "paper.pdf", "application/pdf", b"%PDF-1.4"));
    let paper = h.projects.create_project(h.owner.user_id, &h.owner, academic).await?;

    let mut coursework = common::form_of(common::base_fields("coursework", "Course"));
    coursework
        .files
        .push(common::upload("paper_file", "paper.pdf", "application/pdf", b"%PDF-1.4"));
    let course = h.projects.create_project(h.owner.user_id, &h.owner, coursework).await?;

    let paper = h.projects.get_project(paper.id, &h.owner).await?;
    match &paper.project.details {
        ProjectDetails::Academic(details) => {
            assert_eq!(details.paper_file_id, paper.files.first().map(|f| f.id));
            // omitted year defaults to the project year
            assert_eq!(details.publication_year, 2024);
        }
        other => panic!("unexpected details {:?}", other),
    }

    let course = h.projects.get_project(course.id, &h.owner).await?;
    assert_eq!(course.files.len(), 1, "unbound uploads are still stored");
    match &course.project.details {
        ProjectDetails::Coursework(details) => {
            assert_eq!(details.poster_file_id, None);
            assert_eq!(details.video_file_id, None);
        }
        other => panic!("unexpected details {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn unknown_contributor_rolls_back_everything() -> Result<()> {
    let h = harness_or_skip!();

    let mut fields = common::base_fields("competition", "Robots");
    fields.push(("contributors", "[999999999]".to_string()));
    let mut form = common::form_of(fields);
    form.files.push(common::upload("poster", "poster.png", "image/png", b"png-bytes"));

    let err = h
        .projects
        .create_project(h.owner.user_id, &h.owner, form)
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => assert!(errors.contains_key("contributors")),
        other => panic!("unexpected {:?}", other),
    }

    let (orphans,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
        .bind(h.owner.user_id)
        .fetch_one(&h.pool)
        .await?;
    assert_eq!(orphans, 0);
    assert_eq!(h.storage.usage().await?.files, 0, "stored blobs are discarded");
    Ok(())
}

#[tokio::test]
async fn concurrent_reviews_commit_exactly_once() -> Result<()> {
    let h = harness_or_skip!();
    let id = h.submit("coursework", "Race").await?;

    let (a, b) = tokio::join!(
        h.reviews.review_project(id, &h.admin, ProjectStatus::Approved, None),
        h.reviews.review_project(id, &h.admin, ProjectStatus::Rejected, None),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ServiceError::Conflict(_))));
    assert_eq!(h.reviews_for(id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn held_lock_exhausts_retries_without_side_effects() -> Result<()> {
    let h = harness_or_skip!();
    let id = h.submit("coursework", "Locked").await?;

    let mut blocker = h.pool.begin().await?;
    sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
        .bind(id)
        .execute(&mut *blocker)
        .await?;

    let impatient = ReviewWorkflow::new(
        h.pool.clone(),
        RetryPolicy::new(3, Duration::from_millis(20)),
        Duration::from_millis(50),
        ObserverPipeline::new(),
    );
    let result = impatient.review_project(id, &h.admin, ProjectStatus::Approved, None).await;
    blocker.rollback().await?;

    assert!(matches!(result, Err(ServiceError::Busy { attempts: 3 })));
    assert_eq!(h.reviews_for(id).await?, 0);
    assert_eq!(h.status_of(id).await?, ProjectStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn update_resets_status_and_swaps_subtype() -> Result<()> {
    let h = harness_or_skip!();
    let id = h.submit("coursework", "Evolving").await?;
    h.reviews
        .review_project(id, &h.admin, ProjectStatus::Rejected, Some("needs more".into()))
        .await?;

    let form = common::form(&[("type", "academic"), ("abstract", "Now a paper")]);
    let receipt = h.projects.update_project_with_files(id, &h.owner, form).await?;
    assert_eq!(receipt.status, ProjectStatus::Pending);
    assert_eq!(h.status_of(id).await?, ProjectStatus::Pending);

    assert_eq!(h.subtype_rows(id).await?, 1);

    let aggregate = h.projects.get_project(id, &h.owner).await?;
    assert_eq!(aggregate.project.project_type(), ProjectType::Academic);
    match aggregate.project.details {
        ProjectDetails::Academic(details) => assert_eq!(details.abstract_text, "Now a paper"),
        other => panic!("unexpected details {:?}", other),
    }

    // resubmitted, so it can be reviewed again
    h.reviews.review_project(id, &h.admin, ProjectStatus::Approved, None).await?;
    assert_eq!(h.reviews_for(id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn delete_removes_rows_and_blobs() -> Result<()> {
    let h = harness_or_skip!();

    let mut form = common::form_of(common::base_fields("coursework", "Short lived"));
    form.files.push(common::upload("cover_image", "cover.jpg", "image/jpeg", b"jpeg"));
    form.files.push(common::upload("video", "demo.mp4", "video/mp4", b"mp4"));
    let receipt = h.projects.create_project(h.owner.user_id, &h.owner, form).await?;
    h.reviews.review_project(receipt.id, &h.admin, ProjectStatus::Approved, None).await?;
    assert_eq!(h.storage.usage().await?.files, 2);

    h.projects.delete_project(receipt.id, &h.owner).await?;

    for table in ["project_files", "courseworks", "project_reviews", "project_groups"] {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE project_id = $1", table);
        assert_eq!(common::count(&h.pool, &sql, receipt.id).await?, 0, "{} not cleaned", table);
    }
    assert!(matches!(
        h.projects.get_project(receipt.id, &h.owner).await,
        Err(ServiceError::NotFound(_))
    ));
    assert_eq!(h.storage.usage().await?.files, 0);
    Ok(())
}

#[tokio::test]
async fn strangers_cannot_edit_or_see_pending_work() -> Result<()> {
    let h = harness_or_skip!();
    let id = h.submit("coursework", "Private").await?;
    let stranger = Actor::new(common::create_user(&h.pool, "student").await?, Role::Student);

    let edit = h
        .projects
        .update_project_with_files(id, &stranger, common::form(&[("title", "Mine now")]))
        .await;
    assert!(matches!(edit, Err(ServiceError::Forbidden(_))));

    let delete = h.projects.delete_project(id, &stranger).await;
    assert!(matches!(delete, Err(ServiceError::Forbidden(_))));

    let view = h.projects.get_project(id, &stranger).await;
    assert!(matches!(view, Err(ServiceError::NotFound(_))));

    h.reviews.review_project(id, &h.admin, ProjectStatus::Approved, None).await?;
    let public = h.projects.get_project(id, &stranger).await?;
    assert_eq!(public.project.title, "Private");
    Ok(())
}

#[tokio::test]
async fn observers_record_audit_and_notifications() -> Result<()> {
    let h = harness_or_skip!();
    let id = h.submit("coursework", "Observed").await?;
    h.reviews
        .review_project(id, &h.admin, ProjectStatus::Rejected, Some("incomplete".into()))
        .await?;
    h.observers.drain().await;

    let mut conn = h.pool.acquire().await?;
    let audit = repository::fetch_audit_entries(&mut *conn, "project", id).await?;
    assert!(audit.iter().any(|e| {
        e.old_value.as_deref() == Some("pending") && e.new_value.as_deref() == Some("rejected")
    }));

    let (admin_notes,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications \
         WHERE recipient_id = $1 AND project_id = $2 AND kind = 'review_requested'",
    )
    .bind(h.admin.user_id)
    .bind(id)
    .fetch_one(&h.pool)
    .await?;
    assert_eq!(admin_notes, 1);

    let (message,): (String,) = sqlx::query_as(
        "SELECT message FROM notifications \
         WHERE recipient_id = $1 AND project_id = $2 AND kind = 'review_decided'",
    )
    .bind(h.owner.user_id)
    .bind(id)
    .fetch_one(&h.pool)
    .await?;
    assert!(message.contains("rejected"));
    assert!(message.contains("incomplete"));
    Ok(())
}

#[tokio::test]
async fn contributors_are_normalized_and_replaced() -> Result<()> {
    let h = harness_or_skip!();
    let first = common::create_user(&h.pool, "student").await?;
    let second = common::create_user(&h.pool, "student").await?;

    let mut fields = common::base_fields("coursework", "Team work");
    fields.push(("contributors", format!("{},{},{}", first, h.owner.user_id, first)));
    let receipt = h
        .projects
        .create_project(h.owner.user_id, &h.owner, common::form_of(fields))
        .await?;
    assert_eq!(h.contributors_of(receipt.id).await?, vec![first]);

    // supplied list replaces the stored one
    let list = format!("[{}, {}]", second, h.owner.user_id);
    let replacement = common::form(&[("contributors", list.as_str())]);
    h.projects
        .update_project_with_files(receipt.id, &h.owner, replacement)
        .await?;
    assert_eq!(h.contributors_of(receipt.id).await?, vec![second]);

    // omitted field leaves it alone
    h.projects
        .update_project_with_files(receipt.id, &h.owner, common::form(&[("title", "Team work v2")]))
        .await?;
    assert_eq!(h.contributors_of(receipt.id).await?, vec![second]);
    Ok(())
}

#[tokio::test]
async fn review_by_unknown_admin_is_forbidden_and_leaves_no_trace() -> Result<()> {
    let h = harness_or_skip!();
    let id = h.submit("coursework", "Orphan reviewer").await?;
    let ghost = Actor::new(987_654_321, Role::Admin);

    let result = h.reviews.review_project(id, &ghost, ProjectStatus::Approved, None).await;

    assert!(matches!(result, Err(ServiceError::Forbidden(_))), "got {:?}", result);
    assert_eq!(h.reviews_for(id).await?, 0);
    assert_eq!(h.status_of(id).await?, ProjectStatus::Pending);
    Ok(())
}
