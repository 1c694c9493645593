//! Drive file duplication between canvases.

use std::collections::HashSet;

use chrono::Utc;
use refly_core::error::{CoreError, CoreResult};
use refly_core::ids::gen_drive_file_id;
use refly_core::keys;
use refly_core::remap::RemapTable;
use refly_db::models::drive_file::DriveFile;

use crate::context::ServiceContext;
use crate::limit::run_bounded;

/// Old → new mappings produced by copying a canvas's drive files.
#[derive(Debug, Default)]
pub struct DriveFileRemap {
    pub files: RemapTable,
    pub storage_keys: RemapTable,
    /// File IDs and storage keys of source files that could not be copied.
    /// Nothing in the copy may keep pointing at them.
    pub failed: HashSet<String>,
}

impl DriveFileRemap {
    pub fn mark_failed(&mut self, file_id: &str, storage_key: &str) {
        self.failed.insert(file_id.to_string());
        self.failed.insert(storage_key.to_string());
    }
}

/// Copy every live drive file of `source_canvas_id` onto `target_canvas_id`
/// for `uid`. A failed copy is logged and recorded in
/// [`DriveFileRemap::failed`].
pub async fn duplicate_drive_files(
    ctx: &ServiceContext,
    uid: &str,
    source_canvas_id: &str,
    target_canvas_id: &str,
) -> CoreResult<DriveFileRemap> {
    let files = ctx.store.list_drive_files(source_canvas_id).await?;
    if files.is_empty() {
        return Ok(DriveFileRemap::default());
    }

    let copies = run_bounded(
        ctx.config.drive_file_concurrency,
        files.iter().map(|file| async move {
            let new_id = gen_drive_file_id();
            let new_key = keys::drive_file_key(uid, target_canvas_id, &new_id, &file.name);
            let result = copy_drive_file(ctx, file, uid, target_canvas_id, &new_id, &new_key).await;
            (file, new_id, new_key, result)
        }),
    )
    .await;

    let mut remap = DriveFileRemap::default();
    let mut failed_files = 0usize;
    for (file, new_id, new_key, result) in copies {
        match result {
            Ok(()) => {
                remap.files.insert(file.file_id.clone(), new_id);
                remap.storage_keys.insert(file.storage_key.clone(), new_key);
            }
            Err(e) => {
                tracing::warn!(file_id = %file.file_id, error = %e, "Drive file copy failed");
                remap.mark_failed(&file.file_id, &file.storage_key);
                failed_files += 1;
            }
        }
    }
    tracing::debug!(
        source_canvas_id,
        target_canvas_id,
        copied = remap.files.len(),
        failed = failed_files,
        "Drive files duplicated"
    );
    Ok(remap)
}

async fn copy_drive_file(
    ctx: &ServiceContext,
    file: &DriveFile,
    uid: &str,
    canvas_id: &str,
    new_id: &str,
    new_key: &str,
) -> Result<(), CoreError> {
    ctx.storage.duplicate_file(&file.storage_key, new_key).await?;
    ctx.store
        .create_drive_file(&DriveFile {
            file_id: new_id.to_string(),
            uid: uid.to_string(),
            canvas_id: canvas_id.to_string(),
            storage_key: new_key.to_string(),
            created_at: Utc::now(),
            deleted_at: None,
            ..file.clone()
        })
        .await
}
