//! Repository for the `drive_files` table.

use sqlx::PgPool;

use crate::models::drive_file::DriveFile;

const COLUMNS: &str =
    "file_id, uid, canvas_id, name, mime_type, storage_key, size, source, created_at, deleted_at";

pub struct DriveFileRepo;

impl DriveFileRepo {
    pub async fn create(pool: &PgPool, file: &DriveFile) -> Result<DriveFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO drive_files (file_id, uid, canvas_id, name, mime_type, storage_key, \
                size, source, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DriveFile>(&query)
            .bind(&file.file_id)
            .bind(&file.uid)
            .bind(&file.canvas_id)
            .bind(&file.name)
            .bind(&file.mime_type)
            .bind(&file.storage_key)
            .bind(file.size)
            .bind(&file.source)
            .bind(file.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, file_id: &str) -> Result<Option<DriveFile>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM drive_files WHERE file_id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, DriveFile>(&query)
            .bind(file_id)
            .fetch_optional(pool)
            .await
    }

    /// List the live files of a canvas, oldest first.
    pub async fn list_by_canvas(
        pool: &PgPool,
        canvas_id: &str,
    ) -> Result<Vec<DriveFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM drive_files
             WHERE canvas_id = $1 AND deleted_at IS NULL ORDER BY created_at, file_id"
        );
        sqlx::query_as::<_, DriveFile>(&query)
            .bind(canvas_id)
            .fetch_all(pool)
            .await
    }
}
