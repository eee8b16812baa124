use ordered_float::OrderedFloat;
use tracing::debug;

use crate::layout::{normalize_text, TextLine};

/// Page-1 lines shorter than this are never title candidates.
pub const TITLE_MIN_CHARS: usize = 10;

/// Picks the document title from first-page typography: big text near the
/// top of the page, horizontally centered. Returns an empty string when no
/// line qualifies.
///
/// Scoring: font size, multiplied by 1.5 when the line starts in the top
/// 40% of the page, then damped by how far its center sits from the page's
/// horizontal center (floored at 0.1 so off-center lines stay in the race).
pub fn detect_title(page_size: (f32, f32), lines: &[TextLine]) -> String {
    let (page_width, page_height) = page_size;
    if page_width <= 0.0 || page_height <= 0.0 {
        return String::new();
    }

    let best = lines
        .iter()
        .filter(|line| line.page == 1 && line.text.chars().count() >= TITLE_MIN_CHARS)
        .map(|line| {
            let mut score = line.font_size;
            if line.bbox.1 < page_height * 0.4 {
                score *= 1.5;
            }
            let center = (line.bbox.0 + line.bbox.2) / 2.0;
            let center_diff = (center - page_width / 2.0).abs();
            score *= (1.0 - center_diff / (page_width / 2.0)).max(0.1);
            (OrderedFloat(score), line)
        })
        .max_by_key(|(score, _)| *score);

    match best {
        Some((score, line)) => {
            debug!(score = score.0, text = %line.text, "selected title candidate");
            normalize_text(&line.text)
        }
        None => String::new(),
    }
}
