//! Position import records and the text sent for position tag extraction.

use serde::Deserialize;

use super::ExtractionError;
use crate::db::position_repo::PositionRow;

/// One position as supplied to `import-positions`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PositionInput {
    pub id: Option<String>,
    #[serde(alias = "position", alias = "position_name")]
    pub title: String,
    #[serde(alias = "jd", alias = "job_description")]
    pub description: String,
    #[serde(alias = "require")]
    pub requirements: String,
    #[serde(alias = "salary")]
    pub salary_range: String,
    pub location: String,
    #[serde(alias = "racetrack")]
    pub track: String,
    #[serde(alias = "adviser")]
    pub consultant: String,
    pub level: String,
    #[serde(alias = "hc")]
    pub headcount: Option<i64>,
    pub tags: Option<String>,
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl PositionInput {
    /// Converts to a storable row. A position without a title is rejected.
    pub fn into_row(self, created_at: &str) -> Result<PositionRow, ExtractionError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ExtractionError::MissingField("title"));
        }

        let id = self
            .id
            .and_then(optional)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(PositionRow {
            id,
            position_name: title,
            location: optional(self.location),
            hc: self.headcount,
            salary_range: optional(self.salary_range),
            job_description: optional(self.description),
            requirements: optional(self.requirements),
            tags: self.tags.and_then(optional),
            racetrack: optional(self.track),
            adviser: optional(self.consultant),
            level: optional(self.level),
            status: "open".to_string(),
            created_at: created_at.to_string(),
        })
    }
}

/// Labelled text of a stored position, one line per present field.
/// Returns `None` when the position has no title.
pub fn format_position_content(position: &PositionRow) -> Option<String> {
    let title = position.position_name.trim();
    if title.is_empty() {
        return None;
    }

    let mut lines = vec![format!("职位名称: {}", title)];
    let fields = [
        ("职位描述", position.job_description.as_deref()),
        ("职位要求", position.requirements.as_deref()),
        ("薪资范围", position.salary_range.as_deref()),
        ("工作地点", position.location.as_deref()),
        ("赛道", position.racetrack.as_deref()),
        ("顾问", position.adviser.as_deref()),
        ("级别", position.level.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            lines.push(format!("{}: {}", label, value));
        }
    }
    if let Some(hc) = position.hc {
        lines.push(format!("招聘人数: {}", hc));
    }

    Some(lines.join("\n"))
}
