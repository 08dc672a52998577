use serde_json::json;

use crate::cli::output::{format_bytes, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::services::{LocalStorage, StorageGateway};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let storage = LocalStorage::new(&config::config().storage.upload_dir);
    let usage = storage.usage().await?;

    output_success(
        output_format,
        &format!("Storage usage for {}", storage.root().display()),
        Some(json!({ "files": usage.files, "bytes": usage.bytes })),
        &[
            format!("files: {}", usage.files),
            format!("size:  {}", format_bytes(usage.bytes)),
        ],
    )
}
