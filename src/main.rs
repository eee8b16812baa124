use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use tracing::{info, warn};

use skimmer_pdf::heading::ScoreWeights;
use skimmer_pdf::lang::{LanguageConfig, LanguageProfile};
use skimmer_pdf::logging;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Extract a structured outline from PDF files.",
    arg_required_else_help = true
)]
pub struct Args {
    /// Directory containing the input PDF files
    pub input_dir: PathBuf,

    /// Directory to write the JSON results into
    pub output_dir: PathBuf,

    /// Language of the documents (e.g. "en", "zh")
    #[clap(short, long, default_value = "en")]
    pub lang: String,

    /// Path to the language configuration file
    #[clap(long, default_value = "languages.json")]
    pub lang_config: PathBuf,

    /// Pretty-print the JSON output
    #[clap(short, long)]
    pub pretty: bool,

    /// Process documents in parallel
    #[clap(long)]
    pub parallel: bool,

    /// Enable debug logging
    #[clap(long)]
    pub verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    // Language problems are fatal before any document is touched.
    let config = LanguageConfig::load(&args.lang_config)?;
    let profile = config.get(&args.lang)?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create output directory {:?}", args.output_dir))?;

    let mut pdf_files: Vec<PathBuf> = fs::read_dir(&args.input_dir)
        .with_context(|| format!("failed to read input directory {:?}", args.input_dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdf_files.sort();

    if pdf_files.is_empty() {
        warn!(input_dir = ?args.input_dir, "no PDF files found");
        return Ok(());
    }

    info!(
        documents = pdf_files.len(),
        lang = %args.lang,
        "starting outline extraction"
    );

    let weights = ScoreWeights::default();
    if args.parallel {
        pdf_files.par_iter().for_each(|path| {
            process_document(path, &args.output_dir, profile, &weights, args.pretty)
        });
    } else {
        for path in &pdf_files {
            process_document(path, &args.output_dir, profile, &weights, args.pretty);
        }
    }

    Ok(())
}

/// A failing document is reported and skipped; the batch always continues.
fn process_document(
    path: &Path,
    output_dir: &Path,
    profile: &LanguageProfile,
    weights: &ScoreWeights,
    pretty: bool,
) {
    match try_process(path, output_dir, profile, weights, pretty) {
        Ok(out_path) => info!(document = ?path.file_name(), output = ?out_path, "extracted outline"),
        Err(e) => warn!(document = ?path.file_name(), error = %e, "skipping document"),
    }
}

fn try_process(
    path: &Path,
    output_dir: &Path,
    profile: &LanguageProfile,
    weights: &ScoreWeights,
    pretty: bool,
) -> anyhow::Result<PathBuf> {
    let pdf_bytes = fs::read(path)?;
    let result = skimmer_pdf::extract_outline(&pdf_bytes, profile, weights)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let out_path = output_dir.join(format!("{stem}.json"));

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    fs::write(&out_path, json)?;

    Ok(out_path)
}
