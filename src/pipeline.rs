use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::core::model::Page;
use crate::export::{Exporter, HocrExporter, TextExporter};
use crate::ocr::montage::{is_usable_image, unit_name, Montage};
use crate::ocr::{LayoutBuilder, LayoutOptions, OcrError, PageCache, Recognizer};
use crate::text::cleaner::Cleaner;

pub const MAX_MONTAGE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_dir: PathBuf,
    /// Upper bound on units recognized at the same time.
    pub workers: usize,
    /// Images stacked into one recognition request, `1..=MAX_MONTAGE_SIZE`.
    pub montage_size: usize,
    /// Ignore cache entries and recognize every image again.
    pub force: bool,
    pub layout: LayoutOptions,
}

impl PipelineConfig {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            workers: default_workers(),
            montage_size: 1,
            force: false,
            layout: LayoutOptions::default(),
        }
    }

    /// `0` means one worker per available core.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { default_workers() } else { workers };
        self
    }

    pub fn with_montage_size(mut self, size: usize) -> Self {
        self.montage_size = size.clamp(1, MAX_MONTAGE_SIZE);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Failure of one unit of work, named after its montage.
#[derive(Debug, thiserror::Error)]
#[error("{unit}: {source}")]
pub struct UnitError {
    pub unit: String,
    #[source]
    pub source: OcrError,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("run cancelled before every unit was dispatched")]
    Cancelled,

    #[error("{failed} unit(s) failed")]
    UnitsFailed { failed: usize, errors: Vec<UnitError> },
}

/// Everything a finished run produced: pages sorted by image path, and the
/// error of every unit that failed.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub pages: Vec<Page>,
    pub errors: Vec<UnitError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_pages(self) -> Result<Vec<Page>, PipelineError> {
        if self.errors.is_empty() {
            Ok(self.pages)
        } else {
            Err(PipelineError::UnitsFailed {
                failed: self.errors.len(),
                errors: self.errors,
            })
        }
    }
}

pub struct RecognitionPipeline {
    config: PipelineConfig,
    recognizer: Arc<dyn Recognizer>,
    cache: PageCache,
    builder: LayoutBuilder,
    slots: Arc<Semaphore>,
}

impl RecognitionPipeline {
    pub fn new(config: PipelineConfig, recognizer: Arc<dyn Recognizer>) -> Self {
        let cache = PageCache::new(config.cache_dir.clone());
        let builder = LayoutBuilder::new(config.layout);
        let slots = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            config,
            recognizer,
            cache,
            builder,
            slots,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stops dispatching new units. Units already running are still awaited
    /// and the run ends with [`PipelineError::Cancelled`].
    pub fn cancel(&self) {
        self.slots.close();
    }

    /// Recognizes `images`, reusing cache entries unless forced.
    ///
    /// Uncached images that decode to more than one pixel in each direction
    /// are grouped into montages of `montage_size` in input order, one unit
    /// of work each. Unreadable images are skipped with a warning before
    /// grouping, so they never take a readable neighbour down with them.
    /// A failing unit never stops the others; its error is collected in the
    /// returned [`RunOutcome`].
    pub async fn run(&self, images: &[PathBuf]) -> Result<RunOutcome, PipelineError> {
        let pages: Arc<Mutex<Vec<Page>>> = Arc::new(Mutex::new(Vec::new()));
        let errors: Arc<Mutex<Vec<UnitError>>> = Arc::new(Mutex::new(Vec::new()));

        let mut pending = Vec::with_capacity(images.len());
        for image in images {
            if !self.config.force {
                if let Some(page) = self.cache.load(image) {
                    info!("skipped {}: already converted", image.display());
                    pages.lock().push(page);
                    continue;
                }
            }
            if !is_usable_image(image) {
                warn!("skipped {}: unreadable or empty image", image.display());
                continue;
            }
            pending.push(image.clone());
        }

        let mut tasks = JoinSet::new();
        let mut cancelled = false;
        for chunk in pending.chunks(self.config.montage_size.max(1)) {
            let permit = match Arc::clone(&self.slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    cancelled = true;
                    break;
                }
            };

            let paths = chunk.to_vec();
            let unit = unit_name(&paths);
            let recognizer = Arc::clone(&self.recognizer);
            let builder = self.builder.clone();
            let cache = self.cache.clone();
            let pages = Arc::clone(&pages);
            let errors = Arc::clone(&errors);

            tasks.spawn(async move {
                let _permit = permit;
                match recognize_unit(paths, recognizer.as_ref(), &builder, &cache).await {
                    Ok(unit_pages) => {
                        if !unit_pages.is_empty() {
                            info!("converted {unit}");
                        }
                        pages.lock().extend(unit_pages);
                    }
                    Err(source) => {
                        warn!("failed to convert {unit}: {source}");
                        errors.lock().push(UnitError { unit, source });
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                errors.lock().push(UnitError {
                    unit: "worker".to_string(),
                    source: OcrError::Task(err.to_string()),
                });
            }
        }

        if cancelled {
            warn!("run cancelled");
            return Err(PipelineError::Cancelled);
        }

        let mut pages = std::mem::take(&mut *pages.lock());
        pages.sort_by(|a, b| a.image.cmp(&b.image));
        let errors = std::mem::take(&mut *errors.lock());

        for err in &errors {
            error!("{err}");
        }
        info!(pages = pages.len(), failed = errors.len(), "recognition finished");

        Ok(RunOutcome { pages, errors })
    }
}

async fn recognize_unit(
    paths: Vec<PathBuf>,
    recognizer: &dyn Recognizer,
    builder: &LayoutBuilder,
    cache: &PageCache,
) -> Result<Vec<Page>, OcrError> {
    let prepared = tokio::task::spawn_blocking(move || prepare_montage(paths))
        .await
        .map_err(|err| OcrError::Task(err.to_string()))??;
    let Some((montage, png)) = prepared else {
        return Ok(Vec::new());
    };
    let unit = montage.name();

    debug!("recognizing {unit} ({} image(s), {} bytes)", montage.len(), png.len());
    let Some(annotation) = recognizer.recognize(&png).await? else {
        warn!("{unit}: no text found");
        return Ok(Vec::new());
    };
    let Some(pages) = builder.build_pages(&annotation, &montage) else {
        warn!("{unit}: no text found");
        return Ok(Vec::new());
    };

    for page in &pages {
        cache.store(page)?;
    }
    Ok(pages)
}

/// Builds the montage of one unit and its PNG payload. Images were checked
/// before dispatch, so a read failure here is a unit error. A blank canvas
/// has no work to do.
fn prepare_montage(paths: Vec<PathBuf>) -> Result<Option<(Montage, Vec<u8>)>, OcrError> {
    let montage = Montage::create(&paths)?;
    if montage.is_blank() {
        warn!("skipped {}: image is empty", montage.name());
        return Ok(None);
    }

    info!("generated montage {}", montage.name());
    let png = montage.encode_png()?;
    Ok(Some((montage, png)))
}

/// Writes `<output>/vision-text/<stem>.txt` and `<output>/<stem>_hocr.hocr`
/// for every page.
pub fn export_pages(pages: &[Page], output: &Path, cleaner: &Cleaner) -> Result<()> {
    let text_exporter = TextExporter::new(output.join("vision-text"), cleaner.clone());
    text_exporter.export(pages)?;

    let hocr_exporter = HocrExporter::new(output.to_path_buf(), cleaner.clone());
    hocr_exporter.export(pages)?;

    Ok(())
}
