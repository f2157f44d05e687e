//! Resume repository: CRUD operations for the `resume` table.

use rusqlite::{params, Connection, Row};

use super::tag_repo::{self, ResumeTagsRow};
use super::{Database, DatabaseError};

/// A raw resume (profile) row. JSON columns are stored as text.
#[derive(Debug, Clone)]
pub struct ResumeRow {
    pub id: String,
    pub file_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub years_experience: i64,
    pub education: String,
    pub work_experience: String,
    pub projects: String,
    pub skills: String,
    pub certifications: String,
    pub languages: String,
    pub extra_sections: String,
    pub raw_json: String,
    pub tags: String,
    pub status: String,
    pub created_at: String,
}

impl ResumeRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            file_id: row.get("file_id")?,
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            location: row.get("location")?,
            headline: row.get("headline")?,
            summary: row.get("summary")?,
            years_experience: row.get("years_experience")?,
            education: row.get("education")?,
            work_experience: row.get("work_experience")?,
            projects: row.get("projects")?,
            skills: row.get("skills")?,
            certifications: row.get("certifications")?,
            languages: row.get("languages")?,
            extra_sections: row.get("extra_sections")?,
            raw_json: row.get("raw_json")?,
            tags: row.get("tags")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new resume row. Profiles are never updated in place.
pub fn insert(db: &Database, resume: &ResumeRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_row(conn, resume))
}

/// Inserts a resume row together with its tag record. Either both rows are
/// written or neither is.
pub fn insert_with_tags(
    db: &Database,
    resume: &ResumeRow,
    tags: &ResumeTagsRow,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        insert_row(&tx, resume)?;
        tag_repo::upsert_row(&tx, tags)?;
        tx.commit()?;
        Ok(())
    })
}

fn insert_row(conn: &Connection, resume: &ResumeRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO resume (id, file_id, full_name, email, phone, location, headline,
         summary, years_experience, education, work_experience, projects, skills,
         certifications, languages, extra_sections, raw_json, tags, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
         ?17, ?18, ?19, ?20)",
        params![
            resume.id,
            resume.file_id,
            resume.full_name,
            resume.email,
            resume.phone,
            resume.location,
            resume.headline,
            resume.summary,
            resume.years_experience,
            resume.education,
            resume.work_experience,
            resume.projects,
            resume.skills,
            resume.certifications,
            resume.languages,
            resume.extra_sections,
            resume.raw_json,
            resume.tags,
            resume.status,
            resume.created_at,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ResumeRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM resume WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], ResumeRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

pub fn find_by_file_id(db: &Database, file_id: &str) -> Result<Vec<ResumeRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM resume WHERE file_id = ?1 ORDER BY created_at")?;
        let rows = stmt
            .query_map(params![file_id], ResumeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Resumes that have a profile but no `resume_tags` row yet.
pub fn list_untagged(db: &Database) -> Result<Vec<ResumeRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT r.* FROM resume r
             LEFT JOIN resume_tags t ON t.resume_id = r.id
             WHERE t.id IS NULL
             ORDER BY r.created_at",
        )?;
        let rows = stmt
            .query_map([], ResumeRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM resume", [], |r| r.get(0))?))
}
