//! Tag dictionary repository: extra vocabulary entries per category.

use rusqlite::params;

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub tag_name: String,
    pub category: String,
}

pub fn list_all(db: &Database) -> Result<Vec<DictionaryEntry>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT tag_name, category FROM tag_dictionary ORDER BY category, tag_name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DictionaryEntry {
                    tag_name: row.get(0)?,
                    category: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Adds an entry; an existing identical entry is left alone.
pub fn insert(db: &Database, tag_name: &str, category: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO tag_dictionary (tag_name, category) VALUES (?1, ?2)",
            params![tag_name, category],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_list() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "kotlin", "技术类").unwrap();
        insert(&db, "kotlin", "技术类").unwrap();
        insert(&db, "猎头", "非技术类").unwrap();

        let entries = list_all(&db).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&DictionaryEntry {
            tag_name: "kotlin".to_string(),
            category: "技术类".to_string(),
        }));
    }
}
