//! Processing statistics repository: daily pipeline counters.

use rusqlite::params;
use serde::Serialize;

use super::{Database, DatabaseError};

/// Counter deltas added to one day's row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDelta {
    pub total_processed: i64,
    pub successful: i64,
    pub failed: i64,
    pub ocr_failed: i64,
    pub llm_failed: i64,
    pub db_failed: i64,
}

impl CounterDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single statistics row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatRow {
    pub date: String,
    #[serde(flatten)]
    pub counters: CounterDelta,
}

/// Adds `delta` to the counters of `date` (YYYY-MM-DD), creating the row.
pub fn record(db: &Database, date: &str, delta: &CounterDelta) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO processing_stats (date, total_processed, successful, failed,
             ocr_failed, llm_failed, db_failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(date) DO UPDATE SET
               total_processed = total_processed + ?2,
               successful = successful + ?3,
               failed = failed + ?4,
               ocr_failed = ocr_failed + ?5,
               llm_failed = llm_failed + ?6,
               db_failed = db_failed + ?7",
            params![
                date,
                delta.total_processed,
                delta.successful,
                delta.failed,
                delta.ocr_failed,
                delta.llm_failed,
                delta.db_failed,
            ],
        )?;
        Ok(())
    })
}

/// Most recent days first.
pub fn recent(db: &Database, limit: u32) -> Result<Vec<ProcessingStatRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT date, total_processed, successful, failed, ocr_failed, llm_failed, db_failed
             FROM processing_stats ORDER BY date DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(ProcessingStatRow {
                    date: row.get(0)?,
                    counters: CounterDelta {
                        total_processed: row.get(1)?,
                        successful: row.get(2)?,
                        failed: row.get(3)?,
                        ocr_failed: row.get(4)?,
                        llm_failed: row.get(5)?,
                        db_failed: row.get(6)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let db = Database::open_in_memory().unwrap();
        let delta = CounterDelta {
            total_processed: 2,
            successful: 1,
            failed: 1,
            ocr_failed: 1,
            ..Default::default()
        };
        record(&db, "2026-03-01", &delta).unwrap();
        record(&db, "2026-03-01", &delta).unwrap();
        record(&db, "2026-03-02", &CounterDelta { total_processed: 1, successful: 1, ..Default::default() }).unwrap();

        let rows = recent(&db, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2026-03-02");
        assert_eq!(rows[1].counters.total_processed, 4);
        assert_eq!(rows[1].counters.ocr_failed, 2);
    }

    #[test]
    fn test_serializes_camel_case() {
        let row = ProcessingStatRow {
            date: "2026-03-01".to_string(),
            counters: CounterDelta { db_failed: 1, ..Default::default() },
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["dbFailed"], 1);
        assert_eq!(json["date"], "2026-03-01");
    }
}
