//! Candidate tag repository: the `resume_tags` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone)]
pub struct ResumeTagsRow {
    pub id: String,
    pub resume_id: String,
    pub category: String,
    pub market: String,
    /// JSON object with the tag lists (market_field, education, ...).
    pub tags: String,
    pub created_at: String,
}

impl ResumeTagsRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            resume_id: row.get("resume_id")?,
            category: row.get("category")?,
            market: row.get("market")?,
            tags: row.get("tags")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts the tag record for a resume, replacing the lists if one exists.
///
/// Keyed on `resume_id`, so a retried write after an ambiguous failure
/// cannot create a second record.
pub fn upsert(db: &Database, tags: &ResumeTagsRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| upsert_row(conn, tags))
}

pub(crate) fn upsert_row(conn: &Connection, tags: &ResumeTagsRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO resume_tags (id, resume_id, category, market, tags, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(resume_id) DO UPDATE SET
           category = excluded.category,
           market = excluded.market,
           tags = excluded.tags",
        params![
            tags.id,
            tags.resume_id,
            tags.category,
            tags.market,
            tags.tags,
            tags.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_resume_id(
    db: &Database,
    resume_id: &str,
) -> Result<Option<ResumeTagsRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM resume_tags WHERE resume_id = ?1")?;
        let mut rows = stmt.query_map(params![resume_id], ResumeTagsRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Every committed candidate tag record, oldest first. This is the
/// candidate pool read by the matching pass.
pub fn list_all(db: &Database) -> Result<Vec<ResumeTagsRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM resume_tags ORDER BY created_at, resume_id")?;
        let rows = stmt
            .query_map([], ResumeTagsRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
