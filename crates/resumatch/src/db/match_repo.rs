//! Match result repository.
//!
//! Results for a position are replaced wholesale: delete, then insert.
//! The two steps are separate statements.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub position_id: String,
    pub match_resume: String,
    pub rank: i64,
    pub skill_score: i64,
    pub education_score: i64,
    pub other_score: i64,
    pub sum_score: i64,
    pub created_at: String,
}

impl MatchRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            position_id: row.get("position_id")?,
            match_resume: row.get("match_resume")?,
            rank: row.get("rank")?,
            skill_score: row.get("skill_score")?,
            education_score: row.get("education_score")?,
            other_score: row.get("other_score")?,
            sum_score: row.get("sum_score")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Removes every result row of a position. Returns the number deleted.
pub fn delete_for_position(db: &Database, position_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.execute(
            "DELETE FROM match_result WHERE position_id = ?1",
            params![position_id],
        )?)
    })
}

/// Inserts a ranked set. Rows already present for the same pair are
/// overwritten, so repeating the call after a partial failure converges.
pub fn insert_all(db: &Database, rows: &[MatchRow]) -> Result<(), DatabaseError> {
    if rows.is_empty() {
        return Ok(());
    }
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO match_result (position_id, match_resume, rank, skill_score,
             education_score, other_score, sum_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for row in rows {
            stmt.execute(params![
                row.position_id,
                row.match_resume,
                row.rank,
                row.skill_score,
                row.education_score,
                row.other_score,
                row.sum_score,
                row.created_at,
            ])?;
        }
        Ok(())
    })
}

/// Results of a position in rank order.
pub fn list_for_position(db: &Database, position_id: &str) -> Result<Vec<MatchRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM match_result WHERE position_id = ?1 ORDER BY rank")?;
        let rows = stmt
            .query_map(params![position_id], MatchRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::position_repo::{self, fixtures::position};
    use crate::db::resume_repo::fixtures::seed_resume;

    fn row(position_id: &str, resume: &str, rank: i64, sum: i64) -> MatchRow {
        MatchRow {
            position_id: position_id.to_string(),
            match_resume: resume.to_string(),
            rank,
            skill_score: 20,
            education_score: 60,
            other_score: 0,
            sum_score: sum,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_replace_results_for_position() {
        let db = Database::open_in_memory().unwrap();
        position_repo::insert(&db, &position("p1", "Rust Engineer")).unwrap();
        seed_resume(&db, "r1");
        seed_resume(&db, "r2");

        insert_all(&db, &[row("p1", "r1", 1, 90), row("p1", "r2", 2, 80)]).unwrap();
        assert_eq!(list_for_position(&db, "p1").unwrap().len(), 2);

        assert_eq!(delete_for_position(&db, "p1").unwrap(), 2);
        insert_all(&db, &[row("p1", "r2", 1, 95)]).unwrap();

        let rows = list_for_position(&db, "p1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].match_resume, "r2");
    }

    #[test]
    fn test_insert_empty_is_noop() {
        let db = Database::open_in_memory().unwrap();
        insert_all(&db, &[]).unwrap();
        assert!(list_for_position(&db, "p1").unwrap().is_empty());
    }
}
