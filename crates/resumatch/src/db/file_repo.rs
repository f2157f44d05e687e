//! File repository: the `files` table and its two stage columns.

use rusqlite::{params, Row};

use super::{now_timestamp, Database, DatabaseError};
use crate::pipeline::status::{Stage, StageStatus};

/// A raw file row from the database.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: String,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub user_id: Option<String>,
    pub ocr_status: StageStatus,
    pub ocr_started_at: Option<String>,
    pub ocr_completed_at: Option<String>,
    pub ocr_error: Option<String>,
    pub llm_status: StageStatus,
    pub llm_started_at: Option<String>,
    pub llm_completed_at: Option<String>,
    pub llm_error: Option<String>,
    pub created_at: String,
}

impl FileRow {
    /// A fresh record with both stages pending.
    pub fn new(id: &str, file_name: &str, storage_path: &str, file_size: i64) -> Self {
        Self {
            id: id.to_string(),
            file_name: file_name.to_string(),
            storage_path: storage_path.to_string(),
            file_size,
            user_id: None,
            ocr_status: StageStatus::Pending,
            ocr_started_at: None,
            ocr_completed_at: None,
            ocr_error: None,
            llm_status: StageStatus::Pending,
            llm_started_at: None,
            llm_completed_at: None,
            llm_error: None,
            created_at: now_timestamp(),
        }
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Ocr => self.ocr_status,
            Stage::Extraction => self.llm_status,
        }
    }

    pub fn error(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Ocr => self.ocr_error.as_deref(),
            Stage::Extraction => self.llm_error.as_deref(),
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            file_name: row.get("file_name")?,
            storage_path: row.get("storage_path")?,
            file_size: row.get("file_size")?,
            user_id: row.get("user_id")?,
            ocr_status: parse_status(row, "ocr_status")?,
            ocr_started_at: row.get("ocr_started_at")?,
            ocr_completed_at: row.get("ocr_completed_at")?,
            ocr_error: row.get("ocr_error")?,
            llm_status: parse_status(row, "llm_status")?,
            llm_started_at: row.get("llm_started_at")?,
            llm_completed_at: row.get("llm_completed_at")?,
            llm_error: row.get("llm_error")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn parse_status(row: &Row<'_>, column: &str) -> Result<StageStatus, rusqlite::Error> {
    let raw: String = row.get(column)?;
    raw.parse::<StageStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// Inserts a new file row.
pub fn insert(db: &Database, file: &FileRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO files (id, file_name, storage_path, file_size, user_id,
             ocr_status, ocr_started_at, ocr_completed_at, ocr_error,
             llm_status, llm_started_at, llm_completed_at, llm_error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                file.id,
                file.file_name,
                file.storage_path,
                file.file_size,
                file.user_id,
                file.ocr_status.as_str(),
                file.ocr_started_at,
                file.ocr_completed_at,
                file.ocr_error,
                file.llm_status.as_str(),
                file.llm_started_at,
                file.llm_completed_at,
                file.llm_error,
                file.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Writes one stage transition.
///
/// `processing` stamps the start time, `completed`/`failed` stamp the
/// completion time, and `failed` also stores the error text. The update is
/// a plain overwrite so repeating it is harmless.
pub fn set_stage_status(
    db: &Database,
    id: &str,
    stage: Stage,
    status: StageStatus,
    error: Option<&str>,
) -> Result<(), DatabaseError> {
    let prefix = stage.column_prefix();
    let now = now_timestamp();

    let sql = match status {
        StageStatus::Pending => format!("UPDATE files SET {prefix}_status = ?2 WHERE id = ?1"),
        StageStatus::Processing => format!(
            "UPDATE files SET {prefix}_status = ?2, {prefix}_started_at = ?3, \
             {prefix}_error = NULL WHERE id = ?1"
        ),
        StageStatus::Completed => format!(
            "UPDATE files SET {prefix}_status = ?2, {prefix}_completed_at = ?3 WHERE id = ?1"
        ),
        StageStatus::Failed => format!(
            "UPDATE files SET {prefix}_status = ?2, {prefix}_completed_at = ?3, \
             {prefix}_error = ?4 WHERE id = ?1"
        ),
    };

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let changed = match status {
            StageStatus::Pending => stmt.execute(params![id, status.as_str()])?,
            StageStatus::Processing | StageStatus::Completed => {
                stmt.execute(params![id, status.as_str(), now])?
            }
            StageStatus::Failed => stmt.execute(params![id, status.as_str(), now, error])?,
        };
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: "files",
                id: id.to_string(),
            });
        }
        Ok(())
    })
}

/// Updates where the file currently lives on disk.
pub fn update_storage_path(db: &Database, id: &str, path: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE files SET storage_path = ?2 WHERE id = ?1",
            params![id, path],
        )?;
        Ok(())
    })
}

/// Finds a file by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<FileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM files WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], FileRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Counts files per status of one stage, e.g. `[("completed", 12), ("failed", 1)]`.
pub fn count_by_status(db: &Database, stage: Stage) -> Result<Vec<(String, u64)>, DatabaseError> {
    let sql = format!(
        "SELECT {prefix}_status, COUNT(*) FROM files GROUP BY {prefix}_status ORDER BY {prefix}_status",
        prefix = stage.column_prefix()
    );
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    })
}
