use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use strsim::normalized_levenshtein;

use crate::parse::TextElement;

/// Two strings are considered the same text when their similarity reaches
/// this ratio. Used to keep the detected title out of the heading pool.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// One visual line of text with its typographic attributes.
///
/// Coordinates are top-down page space: `bbox.1` is the top edge, `bbox.3`
/// the bottom edge, and y grows toward the bottom of the page. Lines are
/// globally ordered by (page, top edge).
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Dominant size on the line: the largest among its text runs.
    pub font_size: f32,
    pub bold: bool,
    pub page: u32,
    /// (x_min, y_min, x_max, y_max)
    pub bbox: (f32, f32, f32, f32),
}

impl TextLine {
    /// Builds a line from text runs already sorted by x position. The text
    /// is the space-joined run text; size and boldness come from the run
    /// with the largest font size.
    pub fn from_elements(page: u32, items: &[TextElement]) -> Option<Self> {
        let dominant = items.iter().max_by_key(|e| OrderedFloat(e.font_size))?;

        let mut text = String::new();
        let (mut x_min, mut y_min, mut x_max, mut y_max) =
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN);

        for it in items {
            x_min = x_min.min(it.bbox.0);
            y_min = y_min.min(it.bbox.1);
            x_max = x_max.max(it.bbox.2);
            y_max = y_max.max(it.bbox.3);

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(it.text.trim());
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return None;
        }

        Some(TextLine {
            text,
            font_size: dominant.font_size,
            bold: dominant.bold,
            page,
            bbox: (x_min, y_min, x_max, y_max),
        })
    }
}

/// Groups a page's text runs into visual lines.
///
/// Runs are sorted top-to-bottom then left-to-right; consecutive runs whose
/// top edges sit within `join_threshold` of each other share a line.
pub fn group_into_lines(
    page: u32,
    elements: &[TextElement],
    join_threshold: f32,
) -> Vec<TextLine> {
    let mut elements: Vec<TextElement> = elements.to_vec();
    elements.sort_by(|a, b| {
        a.bbox
            .1
            .total_cmp(&b.bbox.1)
            .then_with(|| a.bbox.0.total_cmp(&b.bbox.0))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextElement> = Vec::new();
    let mut current_y = f32::MAX;

    for elem in elements {
        if current.is_empty() {
            current_y = elem.bbox.1;
            current.push(elem);
        } else if (elem.bbox.1 - current_y).abs() < join_threshold {
            current.push(elem);
        } else {
            current.sort_by(|a, b| a.bbox.0.total_cmp(&b.bbox.0));
            lines.extend(TextLine::from_elements(page, &current));
            current_y = elem.bbox.1;
            current = vec![elem];
        }
    }

    if !current.is_empty() {
        current.sort_by(|a, b| a.bbox.0.total_cmp(&b.bbox.0));
        lines.extend(TextLine::from_elements(page, &current));
    }

    lines
}

/// Flattens per-page lines into a single sequence in reading order:
/// by page, then by top edge.
pub fn collect_document_lines(pages: &BTreeMap<u32, Vec<TextElement>>) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = pages
        .iter()
        .flat_map(|(page, elements)| group_into_lines(*page, elements, 5.0))
        .collect();

    lines.sort_by(|a, b| a.page.cmp(&b.page).then_with(|| a.bbox.1.total_cmp(&b.bbox.1)));
    lines
}

/// Collapses runs of identical consecutive alphanumeric characters to one
/// occurrence. PDFs occasionally render the same glyph twice at the same
/// position; repeated punctuation ("...", "--") is intentional and kept.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if prev != Some(c) || !c.is_alphanumeric() {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Case-insensitive sequence similarity against `SIMILARITY_THRESHOLD`.
pub fn is_similar(a: &str, b: &str) -> bool {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) >= SIMILARITY_THRESHOLD
}
