use anyhow::bail;
use clap::Args;
use serde_json::json;
use std::sync::Arc;

use crate::cli::output::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{repository, DatabaseManager};
use crate::services::{Actor, LocalStorage, ServiceError};
use crate::types::{ProjectStatus, Role};
use crate::AppState;

#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[arg(help = "Project id")]
    pub project_id: i64,

    #[arg(long, help = "Id of the reviewing administrator")]
    pub admin: i64,

    #[arg(long, help = "approved or rejected")]
    pub status: String,

    #[arg(long, help = "Comment shown to the project owner")]
    pub comment: Option<String>,
}

async fn build_state() -> anyhow::Result<AppState> {
    let config = config::config();
    let pool = DatabaseManager::main_pool().await?;
    let storage = Arc::new(LocalStorage::new(&config.storage.upload_dir));
    AppState::build(config, pool, storage)
}

pub async fn handle(args: ReviewArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let status: ProjectStatus = args.status.parse()?;
    let state = build_state().await?;

    // the CLI trusts the database, not a token, for the admin role
    let admin = {
        let mut conn = state.pool.acquire().await?;
        repository::fetch_user(&mut *conn, args.admin).await?
    };
    match admin {
        Some(user) if user.role == Role::Admin => {}
        Some(_) => bail!("user {} is not an administrator", args.admin),
        None => bail!("user {} does not exist", args.admin),
    }

    let actor = Actor::new(args.admin, Role::Admin);
    let result = state
        .reviews
        .review_project(args.project_id, &actor, status, args.comment)
        .await;

    // notifications run detached; wait so the process does not cut them off
    state.observers.drain().await;

    match result {
        Ok(outcome) => output_success(
            output_format,
            &format!(
                "Project {} moved from {} to {}",
                outcome.project_id, outcome.old_status, outcome.new_status
            ),
            Some(json!({ "data": outcome })),
            &[format!("review id: {}", outcome.review.id)],
        ),
        Err(ServiceError::Busy { attempts }) => {
            let message = format!("Project busy after {} attempts, retry later", attempts);
            output_error(output_format, &message, Some("SYSTEM_BUSY"))?;
            bail!("review not applied")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn history(project_id: i64, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = build_state().await?;
    let reviews = state.reviews.review_history(project_id).await?;

    let lines: Vec<String> = reviews
        .iter()
        .map(|r| {
            format!(
                "{}  {} -> {}  by {}{}",
                r.created_at.format("%Y-%m-%d %H:%M"),
                r.old_status,
                r.status,
                r.admin_id,
                r.comment.as_deref().map(|c| format!("  \"{}\"", c)).unwrap_or_default()
            )
        })
        .collect();

    output_success(
        output_format,
        &format!("{} review(s) for project {}", reviews.len(), project_id),
        Some(json!({ "reviews": reviews })),
        &lines,
    )
}
