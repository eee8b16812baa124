use pretty_assertions::assert_eq;

use skimmer_pdf::error::OutlineError;
use skimmer_pdf::heading::{
    identify_headings, score_candidates, score_thresholds, BoilerplateIndex, ScoreWeights,
};
use skimmer_pdf::lang::{LanguageConfig, LanguageProfile};
use skimmer_pdf::layout::{is_similar, normalize_text, TextLine};
use skimmer_pdf::outline::{HeadingLevel, OutlineEntry};
use skimmer_pdf::stats::{FontProfile, ScoreStats};
use skimmer_pdf::title::detect_title;

fn line(text: &str, size: f32, bold: bool, page: u32, y0: f32) -> TextLine {
    line_at(text, size, bold, page, y0, 100.0, 300.0)
}

fn line_at(text: &str, size: f32, bold: bool, page: u32, y0: f32, x0: f32, x1: f32) -> TextLine {
    TextLine {
        text: text.to_string(),
        font_size: size,
        bold,
        page,
        bbox: (x0, y0, x1, y0 + size),
    }
}

#[test]
fn test_normalize_text_collapses_duplicated_glyphs() {
    assert_eq!(normalize_text("HHeelloo"), "Helo");
    assert_eq!(normalize_text("Report"), "Report");
    // Repeated punctuation and whitespace survive untouched.
    assert_eq!(normalize_text("Chapter  1"), "Chapter  1");
    assert_eq!(normalize_text("a--b"), "a--b");
    assert_eq!(normalize_text(""), "");
}

#[test]
fn test_similarity() {
    assert!(is_similar("Chapter 1: Overview", "chapter 1: overview"));
    assert!(is_similar("Annual Report", "Annual Report"));
    assert!(!is_similar("Introduction", "Conclusion"));
    assert!(!is_similar("Some heading", ""));
}

#[test]
fn test_font_profile_mode_and_primary() {
    let lines = vec![
        line("aaa", 10.2, false, 1, 100.0),
        line("bbb", 10.4, false, 1, 120.0),
        line("ccc", 10.0, false, 1, 140.0),
        line("ddd", 12.0, false, 1, 160.0),
        line("eee", 14.0, false, 1, 180.0),
    ];
    let profile = FontProfile::from_lines(&lines);
    assert_eq!(profile.body_size, 10);
    assert_eq!(profile.primary_heading_size, 14);
    assert!(profile.has_heading_structure());
}

#[test]
fn test_font_profile_tie_break_prefers_smallest() {
    let lines = vec![
        line("aaa", 10.0, false, 1, 100.0),
        line("bbb", 10.0, false, 1, 120.0),
        line("ccc", 12.0, false, 1, 140.0),
        line("ddd", 12.0, false, 1, 160.0),
    ];
    let profile = FontProfile::from_lines(&lines);
    assert_eq!(profile.body_size, 10);
    assert_eq!(profile.primary_heading_size, 12);
}

#[test]
fn test_font_profile_degenerate() {
    let uniform = vec![
        line("aaa", 12.0, false, 1, 100.0),
        line("bbb", 12.0, false, 1, 120.0),
    ];
    let profile = FontProfile::from_lines(&uniform);
    assert_eq!(profile.body_size, profile.primary_heading_size);
    assert!(!profile.has_heading_structure());

    let profile = FontProfile::from_lines(&[]);
    assert_eq!(profile.body_size, 0);
    assert!(!profile.has_heading_structure());
}

#[test]
fn test_population_statistics() {
    let stats = ScoreStats::from_scores(&[10.0, 20.0, 90.0]);
    assert!((stats.mean - 40.0).abs() < 1e-4);
    assert!((stats.std_dev - 35.5903).abs() < 1e-3);
}

#[test]
fn test_adaptive_thresholds() {
    // Three or more scores: H1 sits 0.8 population std-devs above the mean.
    let (h1, h2) = score_thresholds(&[10.0, 20.0, 90.0]);
    assert!((h1 - 68.4722).abs() < 1e-2);
    assert!((h2 - 36.0).abs() < 1e-4);

    // Small samples fall back to the plain mean for H1.
    let (h1, h2) = score_thresholds(&[30.0, 50.0]);
    assert!((h1 - 40.0).abs() < 1e-4);
    assert!((h2 - 36.0).abs() < 1e-4);
}

/// Body size 10, primary heading size 24. Hand-computed scores:
/// "Introduction: The System" = 25 + 80 + 15 + 20 = 140 -> H1,
/// "Methods" = 75/7 + 40 + 15 ~ 65.71 -> H2,
/// "Data" = 25/7 + 8 ~ 11.57 -> H3.
fn classification_fixture() -> Vec<TextLine> {
    vec![
        line("plain paragraph text one", 10.0, false, 1, 100.0),
        line("Introduction: The System", 24.0, true, 1, 140.0),
        line("plain paragraph text two", 10.0, false, 1, 170.0),
        line("Methods", 16.0, true, 1, 190.0),
        line("plain paragraph text three", 10.0, false, 1, 210.0),
        line("Data", 12.0, false, 1, 222.0),
        line("plain paragraph text four", 10.0, false, 1, 240.0),
        line("plain paragraph text five", 10.0, false, 1, 252.0),
    ]
}

#[test]
fn test_classification_levels() {
    let lines = classification_fixture();
    let outline = identify_headings(
        &lines,
        "",
        &LanguageProfile::plain("en"),
        &ScoreWeights::default(),
    );

    assert_eq!(
        outline,
        vec![
            OutlineEntry {
                level: HeadingLevel::H1,
                text: "Introduction: The System".to_string(),
                page: 1,
            },
            OutlineEntry {
                level: HeadingLevel::H2,
                text: "Methods".to_string(),
                page: 1,
            },
            OutlineEntry {
                level: HeadingLevel::H3,
                text: "Data".to_string(),
                page: 1,
            },
        ]
    );
}

#[test]
fn test_determinism() {
    let lines = classification_fixture();
    let lang = LanguageProfile::plain("en");
    let weights = ScoreWeights::default();
    let first = identify_headings(&lines, "", &lang, &weights);
    let second = identify_headings(&lines, "", &lang, &weights);
    assert_eq!(first, second);
}

#[test]
fn test_excluded_lines_advance_gap_state() {
    // Three body lines precede the heading; the heading's gap must be
    // measured from the last body line, not from the start of the page.
    let lines = vec![
        line("body", 10.0, false, 1, 100.0),
        line("body", 10.0, false, 1, 120.0),
        line("body", 10.0, false, 1, 140.0),
        line("Heading", 14.0, false, 1, 160.0),
    ];
    let profile = FontProfile::from_lines(&lines);
    let boilerplate = BoilerplateIndex::from_lines(&lines);
    let candidates =
        score_candidates(&lines, "", &profile, &boilerplate, &ScoreWeights::default());

    assert_eq!(candidates.len(), 1);
    // size term 25 (14 is the primary size), gap (160 - 150) / 10 = 1.0 -> 40.
    assert!((candidates[0].score - 65.0).abs() < 1e-3);
}

#[test]
fn test_page_break_synthesizes_gap() {
    let lines = vec![
        line("body", 10.0, false, 1, 700.0),
        line("Heading", 14.0, false, 2, 100.0),
    ];
    let profile = FontProfile::from_lines(&lines);
    let boilerplate = BoilerplateIndex::from_lines(&lines);
    let candidates =
        score_candidates(&lines, "", &profile, &boilerplate, &ScoreWeights::default());

    assert_eq!(candidates.len(), 1);
    // Synthetic gap of two body heights caps the factor at 2.0 -> 80 + 25.
    assert!((candidates[0].score - 105.0).abs() < 1e-3);
}

#[test]
fn test_boilerplate_excluded_from_outline() {
    let mut lines = Vec::new();
    for page in 1..=3 {
        lines.push(line("plain body copy", 10.0, false, page, 100.0));
        lines.push(line("more body copy", 10.0, false, page, 120.0));
        // Same text within the same 10-point band on every page.
        lines.push(line("Confidential Draft", 12.0, false, page, 800.0 + page as f32));
    }
    lines.push(line("Genuine Section Heading", 14.0, false, 1, 140.0));
    lines.sort_by(|a, b| a.page.cmp(&b.page).then(a.bbox.1.total_cmp(&b.bbox.1)));

    let outline = identify_headings(
        &lines,
        "",
        &LanguageProfile::plain("en"),
        &ScoreWeights::default(),
    );

    assert!(outline.iter().all(|e| e.text != "Confidential Draft"));
    assert_eq!(outline.len(), 1);
    assert_eq!(outline[0].text, "Genuine Section Heading");
    assert_eq!(outline[0].level, HeadingLevel::H1);
}

#[test]
fn test_degenerate_typography_yields_empty_outline() {
    let lines = vec![
        line("Everything is twelve point", 12.0, true, 1, 100.0),
        line("including this line", 12.0, false, 1, 130.0),
        line("and this one", 12.0, false, 1, 160.0),
    ];
    let outline = identify_headings(
        &lines,
        "",
        &LanguageProfile::plain("en"),
        &ScoreWeights::default(),
    );
    assert!(outline.is_empty());
}

#[test]
fn test_numbering_strip_and_min_length() {
    let config = LanguageConfig::from_json(
        r#"{"en": {"numbered_heading_regex": "^\\d+(\\.\\d+)*\\s*"}}"#,
    )
    .unwrap();
    let lang = config.get("en").unwrap();

    let lines = vec![
        line("plain body copy", 10.0, false, 1, 100.0),
        line("more body copy", 10.0, false, 1, 120.0),
        line("other body copy", 10.0, false, 1, 140.0),
        line("2.1 Introduction", 14.0, false, 1, 160.0),
        line("1.2 Hi", 14.0, false, 1, 180.0),
        line("Epilogue", 14.0, false, 1, 200.0),
    ];
    let outline = identify_headings(&lines, "", lang, &ScoreWeights::default());

    let texts: Vec<&str> = outline.iter().map(|e| e.text.as_str()).collect();
    // "2.1 " is stripped; "1.2 Hi" shrinks below three characters and is
    // dropped outright; unnumbered text passes through unchanged.
    assert_eq!(texts, vec!["Introduction", "Epilogue"]);
}

#[test]
fn test_title_detection_prefers_large_centered_top_text() {
    let lines = vec![
        line_at("Chapter 1: Overview", 24.0, true, 1, 50.0, 150.0, 450.0),
        line_at("ordinary body copy", 10.0, false, 1, 300.0, 100.0, 300.0),
        line_at("more ordinary body copy", 10.0, false, 1, 320.0, 100.0, 300.0),
        line_at("final ordinary body copy", 10.0, false, 1, 340.0, 100.0, 300.0),
    ];
    let title = detect_title((595.0, 842.0), &lines);
    assert_eq!(title, "Chapter 1: Overview");
}

#[test]
fn test_title_never_appears_as_heading() {
    // The single-page scenario: one big bold top-center line becomes the
    // title, is excluded from candidacy by similarity, and nothing else
    // rises above the body size, so the outline stays empty.
    let lines = vec![
        line_at("Chapter 1: Overview", 24.0, true, 1, 50.0, 150.0, 450.0),
        line_at("ordinary body copy", 10.0, false, 1, 300.0, 100.0, 300.0),
        line_at("more ordinary body copy", 10.0, false, 1, 320.0, 100.0, 300.0),
        line_at("final ordinary body copy", 10.0, false, 1, 340.0, 100.0, 300.0),
    ];
    let title = detect_title((595.0, 842.0), &lines);
    let outline = identify_headings(
        &lines,
        &title,
        &LanguageProfile::plain("en"),
        &ScoreWeights::default(),
    );

    assert_eq!(title, "Chapter 1: Overview");
    assert!(outline.is_empty());
}

#[test]
fn test_title_requires_minimum_length() {
    let lines = vec![line_at("Short", 30.0, true, 1, 50.0, 200.0, 400.0)];
    assert_eq!(detect_title((595.0, 842.0), &lines), "");
}

#[test]
fn test_heading_level_serialization() {
    let entry = OutlineEntry {
        level: HeadingLevel::H2,
        text: "Scope".to_string(),
        page: 4,
    };
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"level":"H2","text":"Scope","page":4}"#);

    assert_eq!(HeadingLevel::from_depth(1), HeadingLevel::H1);
    assert_eq!(HeadingLevel::from_depth(2), HeadingLevel::H2);
    assert_eq!(HeadingLevel::from_depth(7), HeadingLevel::H3);
}

#[test]
fn test_language_config_errors() {
    assert!(LanguageConfig::from_json("not json at all").is_err());
    assert!(LanguageConfig::from_json(r#"{"en": {"numbered_heading_regex": "(["}}"#).is_err());

    let config = LanguageConfig::from_json(r#"{"en": {}}"#).unwrap();
    assert!(matches!(
        config.get("xx"),
        Err(OutlineError::UnsupportedLanguage(_))
    ));
    assert!(config.get("en").is_ok());

    let missing = LanguageConfig::load(std::path::Path::new("no/such/languages.json"));
    assert!(matches!(missing, Err(OutlineError::Config { .. })));
}
