//! Versioned, explicitly reloaded tag vocabulary.
//!
//! Readers take an [`Arc`] snapshot and keep it for a whole operation, so a
//! concurrent [`TagVocabulary::reload`] never changes the corpus under a
//! running normalization.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{info, warn};

use crate::db::dictionary_repo::{self, DictionaryEntry};
use crate::db::{Database, DatabaseError};

pub mod builtin;
pub mod validator;

pub use validator::{TagValidator, ValidationReport};

/// A tag dimension whose values are drawn from the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Category,
    Market,
    /// Skills of a category; the parent key is the category label.
    CategorySkills,
    /// Fields of a market; the parent key is the market label.
    MarketField,
    Education,
}

/// One immutable version of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularySnapshot {
    version: u64,
    categories: Vec<String>,
    markets: Vec<String>,
    category_skills: HashMap<String, Vec<String>>,
    market_fields: HashMap<String, Vec<String>>,
    education: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl VocabularySnapshot {
    /// The built-in corpora as version 1.
    pub fn builtin() -> Self {
        let categories = owned(builtin::CATEGORIES);
        let markets = owned(builtin::MARKETS);
        let category_skills = categories
            .iter()
            .map(|c| (c.clone(), owned(builtin::skills_for_category(c))))
            .collect();
        let market_fields = markets
            .iter()
            .map(|m| (m.clone(), owned(builtin::fields_for_market(m))))
            .collect();

        Self {
            version: 1,
            categories,
            markets,
            category_skills,
            market_fields,
            education: owned(builtin::EDUCATION),
        }
    }

    /// Built-ins extended with dictionary rows. Rows naming an unknown
    /// category are skipped.
    fn with_dictionary(mut self, entries: &[DictionaryEntry], version: u64) -> Self {
        self.version = version;
        for entry in entries {
            let tag = entry.tag_name.trim();
            if tag.is_empty() {
                continue;
            }
            match self.category_skills.get_mut(&entry.category) {
                Some(skills) => {
                    if !skills.iter().any(|s| s == tag) {
                        skills.push(tag.to_string());
                    }
                }
                None => warn!(
                    "Skipping dictionary tag '{}' with unknown category '{}'",
                    tag, entry.category
                ),
            }
        }
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    pub fn education(&self) -> &[String] {
        &self.education
    }

    /// Skill corpus of a category; empty when the category is unknown.
    pub fn category_skills(&self, category: &str) -> &[String] {
        self.category_skills
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Field corpus of a market; empty when the market is unknown.
    pub fn market_fields(&self, market: &str) -> &[String] {
        self.market_fields
            .get(market)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The corpus for a dimension. `parent` is only read for the two
    /// dependent dimensions.
    pub fn corpus(&self, dimension: Dimension, parent: &str) -> &[String] {
        match dimension {
            Dimension::Category => &self.categories,
            Dimension::Market => &self.markets,
            Dimension::CategorySkills => self.category_skills(parent),
            Dimension::MarketField => self.market_fields(parent),
            Dimension::Education => &self.education,
        }
    }

    pub fn contains(&self, dimension: Dimension, parent: &str, tag: &str) -> bool {
        self.corpus(dimension, parent).iter().any(|t| t == tag)
    }
}

/// Process-wide vocabulary handle.
pub struct TagVocabulary {
    dictionary: Option<Database>,
    current: RwLock<Arc<VocabularySnapshot>>,
}

impl TagVocabulary {
    /// A vocabulary made of the built-in corpora only.
    pub fn builtin() -> Self {
        Self {
            dictionary: None,
            current: RwLock::new(Arc::new(VocabularySnapshot::builtin())),
        }
    }

    /// A vocabulary that also reads `tag_dictionary`. The dictionary is
    /// loaded once here; later changes need [`reload`](Self::reload).
    pub fn with_dictionary(db: Database) -> Result<Self, DatabaseError> {
        let entries = dictionary_repo::list_all(&db)?;
        let snapshot = VocabularySnapshot::builtin().with_dictionary(&entries, 1);
        Ok(Self {
            dictionary: Some(db),
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn snapshot(&self) -> Arc<VocabularySnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Rebuilds the snapshot and bumps the version. Returns the new version.
    pub fn reload(&self) -> Result<u64, DatabaseError> {
        let entries = match &self.dictionary {
            Some(db) => dictionary_repo::list_all(db)?,
            None => Vec::new(),
        };

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let version = guard.version() + 1;
        *guard = Arc::new(VocabularySnapshot::builtin().with_dictionary(&entries, version));

        info!(
            "Tag vocabulary reloaded: version {} ({} dictionary entries)",
            version,
            entries.len()
        );
        Ok(version)
    }
}
