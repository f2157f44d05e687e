//! Position repository: `positions` and their `position_tags` records.

use rusqlite::{params, Row};

use super::{now_timestamp, Database, DatabaseError};

pub const STATUS_UPLOADED: &str = "uploaded";
pub const STATUS_MATCHED: &str = "matched";

/// A raw position row.
#[derive(Debug, Clone)]
pub struct PositionRow {
    pub id: String,
    pub position_name: String,
    pub location: Option<String>,
    pub hc: Option<i64>,
    pub salary_range: Option<String>,
    pub job_description: Option<String>,
    pub requirements: Option<String>,
    /// Free-form classification supplied on import.
    pub tags: Option<String>,
    pub racetrack: Option<String>,
    pub adviser: Option<String>,
    pub level: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl PositionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            position_name: row.get("position_name")?,
            location: row.get("location")?,
            hc: row.get("hc")?,
            salary_range: row.get("salary_range")?,
            job_description: row.get("job_description")?,
            requirements: row.get("requirements")?,
            tags: row.get("tags")?,
            racetrack: row.get("racetrack")?,
            adviser: row.get("adviser")?,
            level: row.get("level")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A raw `position_tags` row.
#[derive(Debug, Clone)]
pub struct PositionTagsRow {
    pub id: String,
    pub position_id: String,
    pub category: String,
    pub market: String,
    /// JSON object of tiered tag lists.
    pub tags: String,
    pub status: String,
    pub match_count: i64,
    pub matched_at: Option<String>,
    pub created_at: String,
}

impl PositionTagsRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            position_id: row.get("position_id")?,
            category: row.get("category")?,
            market: row.get("market")?,
            tags: row.get("tags")?,
            status: row.get("status")?,
            match_count: row.get("match_count")?,
            matched_at: row.get("matched_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub fn insert(db: &Database, position: &PositionRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO positions (id, position_name, location, hc, salary_range,
             job_description, requirements, tags, racetrack, adviser, level, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                position.id,
                position.position_name,
                position.location,
                position.hc,
                position.salary_range,
                position.job_description,
                position.requirements,
                position.tags,
                position.racetrack,
                position.adviser,
                position.level,
                position.status,
                position.created_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<PositionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM positions WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], PositionRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Positions that have no tag record yet.
pub fn list_untagged(db: &Database) -> Result<Vec<PositionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT p.* FROM positions p
             LEFT JOIN position_tags t ON t.position_id = p.id
             WHERE t.id IS NULL
             ORDER BY p.created_at, p.id",
        )?;
        let rows = stmt
            .query_map([], PositionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Writes the tag record for a position with status `uploaded`.
///
/// Re-tagging a position resets it to `uploaded` so the next matching
/// pass re-scores it.
pub fn upsert_tags(db: &Database, tags: &PositionTagsRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO position_tags (id, position_id, category, market, tags, status,
             match_count, matched_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7)
             ON CONFLICT(position_id) DO UPDATE SET
               category = excluded.category,
               market = excluded.market,
               tags = excluded.tags,
               status = excluded.status",
            params![
                tags.id,
                tags.position_id,
                tags.category,
                tags.market,
                tags.tags,
                STATUS_UPLOADED,
                tags.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Tag records filtered by status; `None` returns every record.
pub fn list_tags(db: &Database, status: Option<&str>) -> Result<Vec<PositionTagsRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM position_tags WHERE status = ?1 ORDER BY created_at, position_id",
                )?;
                let rows = stmt
                    .query_map(params![status], PositionTagsRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM position_tags ORDER BY created_at, position_id")?;
                let rows = stmt
                    .query_map([], PositionTagsRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

pub fn find_tags(db: &Database, position_id: &str) -> Result<Option<PositionTagsRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM position_tags WHERE position_id = ?1")?;
        let mut rows = stmt.query_map(params![position_id], PositionTagsRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Marks a position as scored, even when `match_count` is zero.
pub fn mark_matched(db: &Database, position_id: &str, match_count: usize) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE position_tags SET status = ?2, match_count = ?3, matched_at = ?4
             WHERE position_id = ?1",
            params![position_id, STATUS_MATCHED, match_count as i64, now_timestamp()],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                table: "position_tags",
                id: position_id.to_string(),
            });
        }
        Ok(())
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn position(id: &str, name: &str) -> PositionRow {
        PositionRow {
            id: id.to_string(),
            position_name: name.to_string(),
            location: Some("Remote".to_string()),
            hc: Some(1),
            salary_range: None,
            job_description: Some("Build staking infrastructure".to_string()),
            requirements: Some("Rust, layer1 experience".to_string()),
            tags: None,
            racetrack: None,
            adviser: None,
            level: None,
            status: "open".to_string(),
            created_at: now_timestamp(),
        }
    }

    pub fn tags(position_id: &str, market: &str, tags_json: &str) -> PositionTagsRow {
        PositionTagsRow {
            id: format!("pt-{}", position_id),
            position_id: position_id.to_string(),
            category: "技术类".to_string(),
            market: market.to_string(),
            tags: tags_json.to_string(),
            status: STATUS_UPLOADED.to_string(),
            match_count: 0,
            matched_at: None,
            created_at: now_timestamp(),
        }
    }
}
