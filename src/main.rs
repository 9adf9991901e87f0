use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vision_hocr::ocr::bridge::DEFAULT_ENDPOINT;
use vision_hocr::ocr::{LayoutOptions, VisionBridge, VisionConfig};
use vision_hocr::pipeline::{export_pages, PipelineConfig, RecognitionPipeline};
use vision_hocr::text::CleanerOptions;

#[derive(Parser, Debug)]
#[command(name = "vision-hocr")]
#[command(version, about = "Recognize page images and write plain text and HOCR", long_about = None)]
struct Cli {
    /// Directory holding the page images
    input: PathBuf,

    /// Recognize every image again, ignoring cached results
    #[arg(short, long)]
    force: bool,

    /// Number of concurrent recognition requests (0 = available cores)
    #[arg(short = 'j', long = "worker", default_value_t = 0)]
    workers: usize,

    /// Number of images stacked into one request (1-5)
    #[arg(short, long, default_value_t = 1)]
    montage: usize,

    /// Keep the hyphen of words broken across lines
    #[arg(long)]
    keep_hyphen: bool,

    /// Do not merge word fragments the service split apart
    #[arg(long)]
    no_merge_words: bool,

    /// Order paragraphs from top to bottom before writing
    #[arg(long)]
    sort_vertical: bool,

    /// File name suffix of the page images
    #[arg(long, default_value = "_ocr.png")]
    suffix: String,

    /// Recognition service API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Recognition service endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[command(flatten)]
    cleaner: CleanerArgs,
}

#[derive(clap::Args, Debug)]
struct CleanerArgs {
    /// Remove all diacritics
    #[arg(long)]
    no_diacritic: bool,

    /// Remove diacritics from Latin letters only
    #[arg(long)]
    no_latin_diacritic: bool,

    /// Normalize subscript digits
    #[arg(long)]
    norm_sub_number: bool,

    /// Normalize superscript digits
    #[arg(long)]
    norm_super_number: bool,

    /// Normalize subscript and superscript digits
    #[arg(long)]
    norm_number: bool,

    /// Normalize hyphen variants to '-'
    #[arg(long)]
    norm_hyphen: bool,

    /// Normalize dash variants
    #[arg(long)]
    norm_dash: bool,

    /// Normalize apostrophe variants to '\''
    #[arg(long)]
    norm_apostrophe: bool,

    /// Normalize quotation marks to '"'
    #[arg(long)]
    norm_quotation: bool,

    /// Normalize hyphens, dashes, apostrophes and quotation marks
    #[arg(long)]
    norm_mark: bool,
}

impl CleanerArgs {
    fn options(&self) -> CleanerOptions {
        let mut options = CleanerOptions {
            no_diacritic: self.no_diacritic,
            no_latin_diacritic: self.no_latin_diacritic,
            norm_sub_number: self.norm_sub_number,
            norm_super_number: self.norm_super_number,
            norm_hyphen: self.norm_hyphen,
            norm_dash: self.norm_dash,
            norm_apostrophe: self.norm_apostrophe,
            norm_quotation: self.norm_quotation,
        };
        if self.norm_number {
            options = options.with_numbers();
        }
        if self.norm_mark {
            options = options.with_marks();
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    if !cli.input.is_dir() {
        anyhow::bail!("Input is not a directory: {}", cli.input.display());
    }

    let images = collect_images(&cli.input, &cli.suffix)?;
    if images.is_empty() {
        anyhow::bail!("No image ending with {:?} in {}", cli.suffix, cli.input.display());
    }
    info!("found {} image(s) in {}", images.len(), cli.input.display());

    let layout = LayoutOptions {
        keep_hyphen: cli.keep_hyphen,
        merge_fragments: !cli.no_merge_words,
    };
    let config = PipelineConfig::new(cli.input.join("vision-cache"))
        .with_workers(cli.workers)
        .with_montage_size(cli.montage)
        .with_force(cli.force)
        .with_layout(layout);

    let bridge = VisionBridge::new(VisionConfig::new(cli.api_key).with_endpoint(cli.endpoint))
        .context("Failed to create recognition client")?;
    let pipeline = RecognitionPipeline::new(config, Arc::new(bridge));

    let outcome = pipeline.run(&images).await?;
    let mut pages = outcome
        .into_pages()
        .context("Some images failed, re-run to retry them")?;

    if cli.sort_vertical {
        for page in &mut pages {
            page.sort_paragraphs_vertically();
        }
    }

    let cleaner = cli.cleaner.options().build();
    export_pages(&pages, &cli.input, &cleaner)
        .with_context(|| format!("Failed to export to: {}", cli.input.display()))?;

    info!("wrote {} page(s) to {}", pages.len(), cli.input.display());
    Ok(())
}

/// Files directly inside `dir` whose name ends with `suffix`, sorted by name.
fn collect_images(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if matches && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
