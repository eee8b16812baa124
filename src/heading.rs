use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::lang::LanguageProfile;
use crate::layout::{is_similar, normalize_text, TextLine};
use crate::outline::{HeadingLevel, OutlineEntry};
use crate::stats::{FontProfile, ScoreStats};

/// Headings whose final text is shorter than this are dropped outright.
pub const HEADING_MIN_CHARS: usize = 3;

/// A key recurring at the same quantized position on at least this many
/// distinct pages is treated as a running header or footer.
pub const BOILERPLATE_MIN_PAGES: usize = 3;

/// Weights for the composite heading score. Carried as a value so callers
/// can tune the balance without touching the scoring logic.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub font_size: f32,
    pub vertical_gap: f32,
    pub bold: f32,
    pub text_shape: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            font_size: 25.0,
            vertical_gap: 40.0,
            bold: 15.0,
            text_shape: 20.0,
        }
    }
}

/// Text recurring at a near-identical vertical position across pages.
///
/// The key buckets the top edge to 10-point bands, so a footer that drifts
/// by a point or two still collapses onto one key. Membership is decided
/// over the whole document before any scoring happens.
#[derive(Debug, Default)]
pub struct BoilerplateIndex {
    keys: HashSet<(String, i32)>,
}

impl BoilerplateIndex {
    pub fn from_lines(lines: &[TextLine]) -> Self {
        let mut pages_by_key: HashMap<(String, i32), HashSet<u32>> = HashMap::new();
        for line in lines {
            pages_by_key
                .entry(Self::key(line))
                .or_default()
                .insert(line.page);
        }

        let keys = pages_by_key
            .into_iter()
            .filter(|(_, pages)| pages.len() >= BOILERPLATE_MIN_PAGES)
            .map(|(key, _)| key)
            .collect();

        BoilerplateIndex { keys }
    }

    pub fn contains(&self, line: &TextLine) -> bool {
        self.keys.contains(&Self::key(line))
    }

    fn key(line: &TextLine) -> (String, i32) {
        (
            line.text.trim().to_string(),
            (line.bbox.1 / 10.0).round() as i32,
        )
    }
}

/// A line that survived the exclusion filters, with its composite score.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub line: &'a TextLine,
    pub score: f32,
}

/// Bottom edge and page of the most recently seen line of any kind.
/// Excluded lines advance it too: the next candidate's gap is measured
/// from its actual predecessor on the page, not the previous candidate.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    last_y1: f32,
    last_page: u32,
}

impl Cursor {
    fn advance(&mut self, line: &TextLine) {
        self.last_y1 = line.bbox.3;
        self.last_page = line.page;
    }
}

/// Scores every non-excluded line in document order. The profile must have
/// heading structure (a size above the body size); the pipeline checks this
/// before scoring.
///
/// The scorer is a left-fold over the ordered line sequence: the only state
/// threaded between steps is the [`Cursor`], so the result is a pure
/// function of (lines, title, font profile, boilerplate set, weights).
pub fn score_candidates<'a>(
    lines: &'a [TextLine],
    title: &str,
    profile: &FontProfile,
    boilerplate: &BoilerplateIndex,
    weights: &ScoreWeights,
) -> Vec<Candidate<'a>> {
    let body_size = profile.body_size as f32;
    let primary_size = profile.primary_heading_size as f32;

    let mut candidates = Vec::new();
    let mut cursor = Cursor {
        last_y1: 0.0,
        last_page: 0,
    };

    for line in lines {
        let excluded = line.font_size <= body_size
            || line.text.is_empty()
            || is_similar(&line.text, title)
            || boilerplate.contains(line);
        if excluded {
            cursor.advance(line);
            continue;
        }

        let mut score =
            (line.font_size - body_size) / (primary_size - body_size) * weights.font_size;

        // A page break implies separation: synthesize a two-line gap.
        let vertical_gap = if line.page == cursor.last_page {
            line.bbox.1 - cursor.last_y1
        } else {
            body_size * 2.0
        };
        let gap_factor = (vertical_gap / body_size).min(2.0);
        score += gap_factor * weights.vertical_gap;

        if line.bold {
            score += weights.bold;
        }
        if line.text.split_whitespace().count() > 4 || line.text.contains(':') {
            score += weights.text_shape;
        }

        candidates.push(Candidate { line, score });
        cursor.advance(line);
    }

    candidates
}

/// H1 and H2 score cutoffs adapted to the sample's own spread.
///
/// With fewer than three candidates there is no usable distribution, so H1
/// falls back to the plain mean; otherwise H1 sits 0.8 population standard
/// deviations above it. H2 is always 0.9 of the mean.
pub fn score_thresholds(scores: &[f32]) -> (f32, f32) {
    let stats = ScoreStats::from_scores(scores);
    let h1 = if scores.len() < 3 {
        stats.mean
    } else {
        stats.mean + stats.std_dev * 0.8
    };
    (h1, stats.mean * 0.9)
}

fn classify(score: f32, h1_threshold: f32, h2_threshold: f32) -> HeadingLevel {
    if score >= h1_threshold {
        HeadingLevel::H1
    } else if score >= h2_threshold {
        HeadingLevel::H2
    } else {
        HeadingLevel::H3
    }
}

/// Turns classified candidates into final entries: normalize, strip the
/// language's leading enumeration, drop anything left too short.
fn assemble(
    candidates: &[Candidate<'_>],
    h1_threshold: f32,
    h2_threshold: f32,
    lang: &LanguageProfile,
) -> Vec<OutlineEntry> {
    let mut outline = Vec::new();
    for candidate in candidates {
        let level = classify(candidate.score, h1_threshold, h2_threshold);

        let mut text = normalize_text(&candidate.line.text);
        if let Some(pattern) = &lang.numbered_heading {
            if pattern.is_match(&text) {
                text = pattern.replace(&text, "").trim().to_string();
            }
        }

        if text.chars().count() >= HEADING_MIN_CHARS {
            outline.push(OutlineEntry {
                level,
                text,
                page: candidate.line.page,
            });
        }
    }
    outline
}

/// The full heuristic pipeline over an ordered line sequence.
///
/// Returns an empty outline when the typography is degenerate (no size
/// above the body size) or when nothing survives filtering; neither case
/// is an error.
pub fn identify_headings(
    lines: &[TextLine],
    title: &str,
    lang: &LanguageProfile,
    weights: &ScoreWeights,
) -> Vec<OutlineEntry> {
    let profile = FontProfile::from_lines(lines);
    if !profile.has_heading_structure() {
        debug!(
            body_size = profile.body_size,
            "no font size above body text, skipping heading analysis"
        );
        return Vec::new();
    }

    let boilerplate = BoilerplateIndex::from_lines(lines);
    let candidates = score_candidates(lines, title, &profile, &boilerplate, weights);
    if candidates.is_empty() {
        return Vec::new();
    }

    let scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    let (h1_threshold, h2_threshold) = score_thresholds(&scores);
    debug!(
        candidates = candidates.len(),
        h1_threshold, h2_threshold, "classifying heading candidates"
    );

    assemble(&candidates, h1_threshold, h2_threshold, lang)
}
