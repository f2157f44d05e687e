//! Typed resume document as extracted from OCR text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{self, RESUME_SCHEMA};
use super::ExtractionError;

/// Sentinel the inference service writes for fields it could not find.
pub const PLACEHOLDER: &str = "暂无";

const ONGOING_END_DATES: &[&str] = &["至今", "现在", "present"];

static RE_LEADING_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d{4})").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: String,
    pub gpa: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub responsibilities: Vec<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub role: String,
    pub tech_stack: Vec<String>,
    pub description: Vec<String>,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    pub name: String,
    pub issued_date: String,
    pub expiry_date: String,
    pub credential_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Language {
    pub language: String,
    pub proficiency: String,
    pub certificate: String,
}

/// A validated resume document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeDocument {
    pub basic_info: BasicInfo,
    pub job_intention: String,
    pub personal_expertise: Vec<String>,
    pub education: Vec<Education>,
    pub work_experience: Vec<WorkExperience>,
    pub projects: Vec<Project>,
    pub skills: Vec<String>,
    pub certifications: Vec<Certification>,
    pub languages: Vec<Language>,
    pub others: Vec<String>,
}

/// Returns the trimmed value unless it is blank or the placeholder.
pub fn present(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        None
    } else {
        Some(trimmed)
    }
}

fn present_items(items: &[String]) -> Vec<&str> {
    items.iter().filter_map(|s| present(s)).collect()
}

impl ResumeDocument {
    /// Validates an extracted payload and decodes it.
    ///
    /// The name may be the placeholder but never blank.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        schema::validate(RESUME_SCHEMA, &value)?;
        let document: Self = serde_json::from_value(value)?;
        if document.basic_info.name.trim().is_empty() {
            return Err(ExtractionError::MissingField("basic_info.name"));
        }
        Ok(document)
    }

    pub fn name(&self) -> Option<&str> {
        present(&self.basic_info.name)
    }

    pub fn headline(&self) -> Option<&str> {
        present(&self.job_intention)
    }

    /// Personal expertise joined with ", ", placeholders dropped.
    pub fn summary(&self) -> Option<String> {
        let items = present_items(&self.personal_expertise);
        if items.is_empty() {
            None
        } else {
            Some(items.join(", "))
        }
    }

    /// Sum of whole years across the work history.
    ///
    /// Dates contribute their leading four digits. An open or ongoing end
    /// date counts as `current_year`; entries that cannot be read count zero.
    pub fn years_of_experience(&self, current_year: i32) -> i64 {
        let read_year = |date: &str| -> Option<i32> {
            RE_LEADING_YEAR
                .captures(date)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        };

        self.work_experience
            .iter()
            .map(|job| {
                let Some(start) = read_year(&job.start_date) else {
                    return 0;
                };
                let end_raw = job.end_date.trim();
                let end = if present(end_raw).is_none()
                    || ONGOING_END_DATES
                        .iter()
                        .any(|o| end_raw.eq_ignore_ascii_case(o))
                {
                    Some(current_year)
                } else {
                    read_year(end_raw)
                };
                match end {
                    Some(end) => i64::from((end - start).max(0)),
                    None => 0,
                }
            })
            .sum()
    }

    /// Text handed to candidate tag extraction.
    pub fn tag_analysis_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        if let Some(intention) = self.headline() {
            lines.push(format!("求职意向: {}", intention));
        }
        if let Some(summary) = self.summary() {
            lines.push(format!("个人优势: {}", summary));
        }

        for edu in &self.education {
            let parts = [edu.school.as_str(), edu.degree.as_str(), edu.field.as_str()];
            let text = join_present(&parts, " ");
            if !text.is_empty() {
                lines.push(format!("教育经历: {}", text));
            }
        }

        for job in &self.work_experience {
            let header = join_present(&[job.company.as_str(), job.position.as_str()], " ");
            if header.is_empty() {
                continue;
            }
            let period = join_present(&[job.start_date.as_str(), job.end_date.as_str()], " - ");
            let duties = present_items(&job.responsibilities).join("; ");
            let mut line = format!("工作经历: {}", header);
            if !period.is_empty() {
                line.push_str(&format!(" ({})", period));
            }
            if !duties.is_empty() {
                line.push_str(&format!(": {}", duties));
            }
            lines.push(line);
        }

        for project in &self.projects {
            let Some(name) = present(&project.name) else {
                continue;
            };
            let stack = present_items(&project.tech_stack).join(", ");
            if stack.is_empty() {
                lines.push(format!("项目经历: {}", name));
            } else {
                lines.push(format!("项目经历: {} [{}]", name, stack));
            }
        }

        let skills = present_items(&self.skills);
        if !skills.is_empty() {
            lines.push(format!("技能: {}", skills.join(", ")));
        }

        lines.join("\n")
    }
}

fn join_present(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .filter_map(|p| present(p))
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        serde_json::json!({
            "basic_info": { "name": "张三", "email": "zhangsan@example.com", "phone": "暂无", "location": "上海" },
            "job_intention": "区块链后端工程师",
            "personal_expertise": ["熟悉 Rust", "暂无", "公链开发经验"],
            "education": [{
                "school": "清华大学", "degree": "硕士", "field": "计算机科学",
                "start_date": "2015-09", "end_date": "2018-06", "gpa": "暂无", "description": "暂无"
            }],
            "work_experience": [
                {
                    "company": "某交易所", "position": "后端工程师",
                    "start_date": "2018-07", "end_date": "2021-03",
                    "responsibilities": ["撮合引擎开发"], "achievements": []
                },
                {
                    "company": "某公链", "position": "核心开发",
                    "start_date": "2021-04", "end_date": "至今",
                    "responsibilities": [], "achievements": []
                }
            ],
            "projects": [{ "name": "跨链桥", "role": "负责人", "tech_stack": ["rust", "solidity"], "description": [], "link": "暂无" }],
            "skills": ["rust", "go"],
            "certifications": [],
            "languages": [],
            "others": ["开源贡献者"]
        })
    }

    #[test]
    fn test_from_value_decodes_document() {
        let doc = ResumeDocument::from_value(sample()).unwrap();
        assert_eq!(doc.name(), Some("张三"));
        assert_eq!(doc.work_experience.len(), 2);
        assert_eq!(doc.projects[0].tech_stack, vec!["rust", "solidity"]);
    }

    #[test]
    fn test_blank_name_fails_but_placeholder_passes() {
        let mut blank = sample();
        blank["basic_info"]["name"] = Value::String("  ".to_string());
        assert!(matches!(
            ResumeDocument::from_value(blank),
            Err(ExtractionError::MissingField("basic_info.name"))
        ));

        let mut placeholder = sample();
        placeholder["basic_info"]["name"] = Value::String(PLACEHOLDER.to_string());
        let doc = ResumeDocument::from_value(placeholder).unwrap();
        assert_eq!(doc.name(), None);
    }

    #[test]
    fn test_missing_work_history_fails_schema() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("work_experience");
        assert!(matches!(
            ResumeDocument::from_value(value),
            Err(ExtractionError::Schema(_))
        ));
    }

    #[test]
    fn test_years_of_experience() {
        let doc = ResumeDocument::from_value(sample()).unwrap();
        // 2018→2021 plus 2021→2026
        assert_eq!(doc.years_of_experience(2026), 8);
    }

    #[test]
    fn test_unreadable_dates_count_zero() {
        let doc = ResumeDocument {
            work_experience: vec![
                WorkExperience {
                    start_date: "去年".to_string(),
                    end_date: "2024".to_string(),
                    ..Default::default()
                },
                WorkExperience {
                    start_date: "2020年3月".to_string(),
                    end_date: "Present".to_string(),
                    ..Default::default()
                },
                WorkExperience {
                    start_date: "2023".to_string(),
                    end_date: "2019".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(doc.years_of_experience(2025), 5);
    }

    #[test]
    fn test_summary_drops_placeholders() {
        let doc = ResumeDocument::from_value(sample()).unwrap();
        assert_eq!(doc.summary().as_deref(), Some("熟悉 Rust, 公链开发经验"));
        assert_eq!(ResumeDocument::default().summary(), None);
    }

    #[test]
    fn test_tag_analysis_text() {
        let doc = ResumeDocument::from_value(sample()).unwrap();
        let text = doc.tag_analysis_text();
        assert!(text.contains("求职意向: 区块链后端工程师"));
        assert!(text.contains("教育经历: 清华大学 硕士 计算机科学"));
        assert!(text.contains("工作经历: 某交易所 后端工程师 (2018-07 - 2021-03): 撮合引擎开发"));
        assert!(text.contains("项目经历: 跨链桥 [rust, solidity]"));
        assert!(text.contains("技能: rust, go"));
        assert!(!text.contains(PLACEHOLDER));
    }
}
