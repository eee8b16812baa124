use std::collections::BTreeMap;

use crate::layout::TextLine;

/// Body and dominant heading sizes derived from a document's font-size
/// frequency distribution. Sizes are rounded to whole points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontProfile {
    /// The most frequent rounded size, assumed to be regular text.
    pub body_size: i32,
    /// The largest rounded size strictly above `body_size`; equals
    /// `body_size` when the document has no detectable structure.
    pub primary_heading_size: i32,
}

impl FontProfile {
    pub fn from_lines(lines: &[TextLine]) -> Self {
        let mut freq: BTreeMap<i32, usize> = BTreeMap::new();
        for line in lines {
            if line.font_size > 0.0 {
                *freq.entry(line.font_size.round() as i32).or_default() += 1;
            }
        }

        // Mode of the rounded sizes. Ascending iteration plus a strict
        // comparison makes the smallest equally-frequent size win.
        let mut body_size = 0;
        let mut best_count = 0;
        for (&size, &count) in &freq {
            if count > best_count {
                body_size = size;
                best_count = count;
            }
        }

        let primary_heading_size = freq
            .keys()
            .rev()
            .find(|&&size| size > body_size)
            .copied()
            .unwrap_or(body_size);

        FontProfile {
            body_size,
            primary_heading_size,
        }
    }

    /// Heading detection only proceeds when some size sits above the body
    /// size. Otherwise the outline is empty; the title is unaffected.
    pub fn has_heading_structure(&self) -> bool {
        self.body_size > 0 && self.primary_heading_size > self.body_size
    }
}

/// Population mean and standard deviation of a score sample.
#[derive(Debug, Clone, Copy)]
pub struct ScoreStats {
    pub mean: f32,
    pub std_dev: f32,
}

impl ScoreStats {
    pub fn from_scores(scores: &[f32]) -> Self {
        if scores.is_empty() {
            return ScoreStats {
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let n = scores.len() as f32;
        let mean = scores.iter().sum::<f32>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
        ScoreStats {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}
