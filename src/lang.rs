use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::error::OutlineError;

/// Raw per-language settings as they appear in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageSettings {
    pub name: Option<String>,
    /// Anchored pattern matching a leading heading enumeration, e.g.
    /// `^\d+(\.\d+)*\s*` for "1.2.3 ". Absent means no stripping.
    pub numbered_heading_regex: Option<String>,
}

/// Compiled settings for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub code: String,
    pub numbered_heading: Option<Regex>,
}

impl LanguageProfile {
    /// A profile that strips nothing. Handy for tests and library callers
    /// that do not care about numbering.
    pub fn plain(code: &str) -> Self {
        LanguageProfile {
            code: code.to_string(),
            numbered_heading: None,
        }
    }
}

/// The full language table, in file order.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    languages: IndexMap<String, LanguageProfile>,
}

impl LanguageConfig {
    /// Loads and compiles the configuration. Any read, parse, or regex
    /// compilation failure is a configuration error; a batch run aborts on
    /// it before opening any document.
    pub fn load(path: &Path) -> Result<Self, OutlineError> {
        let data = fs::read_to_string(path).map_err(|e| OutlineError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&data).map_err(|reason| OutlineError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_json(data: &str) -> Result<Self, String> {
        let raw: IndexMap<String, LanguageSettings> =
            serde_json::from_str(data).map_err(|e| e.to_string())?;

        let mut languages = IndexMap::with_capacity(raw.len());
        for (code, settings) in raw {
            let numbered_heading = match settings.numbered_heading_regex.as_deref() {
                Some(pattern) => Some(
                    Regex::new(pattern)
                        .map_err(|e| format!("bad pattern for '{code}': {e}"))?,
                ),
                None => None,
            };
            languages.insert(
                code.clone(),
                LanguageProfile {
                    code,
                    numbered_heading,
                },
            );
        }

        Ok(LanguageConfig { languages })
    }

    pub fn get(&self, code: &str) -> Result<&LanguageProfile, OutlineError> {
        self.languages
            .get(code)
            .ok_or_else(|| OutlineError::UnsupportedLanguage(code.to_string()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(|s| s.as_str())
    }
}
