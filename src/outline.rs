use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parse::EmbeddedHeading;

/// Outline depth emitted in the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Maps an embedded-outline depth (1-based) onto the output domain.
    /// Depths beyond 3 clamp to `H3`.
    pub fn from_depth(depth: u32) -> Self {
        match depth {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            _ => HeadingLevel::H3,
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingLevel::H1 => write!(f, "H1"),
            HeadingLevel::H2 => write!(f, "H2"),
            HeadingLevel::H3 => write!(f, "H3"),
        }
    }
}

/// One heading in the final result, in original document reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: u32,
}

/// The per-document artifact: a title plus the ordered outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

/// Reformats a document's own outline verbatim. No merging with heuristic
/// results, no nesting validation.
pub fn from_embedded(headings: &[EmbeddedHeading]) -> Vec<OutlineEntry> {
    headings
        .iter()
        .map(|h| OutlineEntry {
            level: HeadingLevel::from_depth(h.level),
            text: h.title.trim().to_string(),
            page: h.page,
        })
        .collect()
}
