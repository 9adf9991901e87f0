use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use vision_hocr::core::geometry::BBox;
use vision_hocr::ocr::annotation::{
    AnnotatedBlock, AnnotatedPage, AnnotatedParagraph, AnnotatedSymbol, AnnotatedWord,
    BoundingPoly, BreakType, DetectedBreak, TextAnnotation, TextProperty,
};
use vision_hocr::ocr::{OcrError, PageCache, Recognizer};
use vision_hocr::pipeline::{export_pages, PipelineConfig, PipelineError, RecognitionPipeline};
use vision_hocr::text::Cleaner;

type Script = Box<dyn Fn(u32, u32) -> TextAnnotation + Send + Sync>;

/// Stand-in for the recognition service. Identifies the request by the
/// canvas width, fails one chosen width and answers everything else with
/// the annotation produced by `script`.
struct ScriptedRecognizer {
    fail_width: Option<u32>,
    script: Script,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRecognizer {
    fn new(fail_width: Option<u32>, script: Script) -> Arc<Self> {
        Arc::new(Self {
            fail_width,
            script,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, image_png: &[u8]) -> Result<Option<TextAnnotation>, OcrError> {
        let image = image::load_from_memory(image_png).map_err(OcrError::ImageEncode)?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if Some(image.width()) == self.fail_width {
            return Err(OcrError::Api("quota exceeded".to_string()));
        }
        Ok(Some((self.script)(image.width(), image.height())))
    }
}

fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

fn with_break(kind: BreakType) -> Option<TextProperty> {
    Some(TextProperty {
        detected_break: Some(DetectedBreak {
            kind,
            is_prefix: false,
        }),
    })
}

/// One word at `(x, y)`, ten pixels per glyph, with `last_break` on its
/// final symbol.
fn word(text: &str, x: i32, y: i32, last_break: BreakType) -> AnnotatedWord {
    let count = text.chars().count();
    let symbols = text
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let x0 = x + 10 * i as i32;
            AnnotatedSymbol {
                bounding_box: Some(BoundingPoly::rect(x0, y, x0 + 10, y + 20)),
                text: c.to_string(),
                property: if i + 1 == count { with_break(last_break) } else { None },
            }
        })
        .collect();

    AnnotatedWord {
        bounding_box: Some(BoundingPoly::rect(x, y, x + 10 * count as i32, y + 20)),
        symbols,
    }
}

fn paragraph(words: Vec<AnnotatedWord>, bbox: (i32, i32, i32, i32)) -> AnnotatedParagraph {
    AnnotatedParagraph {
        bounding_box: Some(BoundingPoly::rect(bbox.0, bbox.1, bbox.2, bbox.3)),
        words,
    }
}

fn annotation(width: u32, height: u32, paragraphs: Vec<AnnotatedParagraph>) -> TextAnnotation {
    TextAnnotation {
        pages: vec![AnnotatedPage {
            width,
            height,
            blocks: vec![AnnotatedBlock {
                bounding_box: None,
                paragraphs,
            }],
        }],
        text: String::new(),
    }
}

/// Integration test: partial failure keeps successes, reruns retry only the failure
#[tokio::test]
async fn test_pipeline_partial_failure_and_rerun() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let images: Vec<PathBuf> = (1..=5)
        .map(|i| write_image(dir.path(), &format!("00{i}_ocr.png"), 10 * i, 30))
        .collect();

    let recognizer = ScriptedRecognizer::new(
        Some(30),
        Box::new(|width: u32, _: u32| {
            annotation(width, 30, vec![paragraph(vec![word("ok", 0, 0, BreakType::LineBreak)], (0, 0, 20, 20))])
        }),
    );
    let config = PipelineConfig::new(dir.path().join("vision-cache")).with_workers(2);

    let pipeline = RecognitionPipeline::new(config.clone(), recognizer.clone());
    let outcome = pipeline.run(&images).await?;

    let converted: Vec<PathBuf> = outcome.pages.iter().map(|p| p.image.clone()).collect();
    assert_eq!(
        converted,
        vec![images[0].clone(), images[1].clone(), images[3].clone(), images[4].clone()]
    );
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].unit, "003_ocr");
    assert_eq!(recognizer.calls(), 5);
    assert!(recognizer.peak.load(Ordering::SeqCst) <= 2);

    let cache = PageCache::new(dir.path().join("vision-cache"));
    assert!(cache.load(&images[0]).is_some());
    assert!(cache.load(&images[2]).is_none());

    match outcome.into_pages() {
        Err(PipelineError::UnitsFailed { failed, .. }) => assert_eq!(failed, 1),
        other => panic!("expected a failed run, got {other:?}"),
    }

    // Cached units are reused; only the failed one is attempted again.
    let pipeline = RecognitionPipeline::new(config, recognizer.clone());
    let rerun = pipeline.run(&images).await?;
    assert_eq!(recognizer.calls(), 6);
    assert_eq!(rerun.pages.len(), 4);
    assert_eq!(rerun.errors.len(), 1);
    Ok(())
}

/// Integration test: forced runs ignore the cache
#[tokio::test]
async fn test_force_rewrite_recognizes_again() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let images = vec![write_image(dir.path(), "001_ocr.png", 40, 30)];
    let recognizer = ScriptedRecognizer::new(None, Box::new(|w: u32, h: u32| annotation(w, h, vec![])));
    let config = PipelineConfig::new(dir.path().join("vision-cache"));

    RecognitionPipeline::new(config.clone(), recognizer.clone()).run(&images).await?;
    RecognitionPipeline::new(config.clone(), recognizer.clone()).run(&images).await?;
    assert_eq!(recognizer.calls(), 1);

    RecognitionPipeline::new(config.with_force(true), recognizer.clone()).run(&images).await?;
    assert_eq!(recognizer.calls(), 2);
    Ok(())
}

/// Integration test: montage results are split back onto their source images
#[tokio::test]
async fn test_montage_pages_are_back_projected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let top = write_image(dir.path(), "001_ocr.png", 80, 100);
    let bottom = write_image(dir.path(), "002_ocr.png", 120, 140);

    let recognizer = ScriptedRecognizer::new(
        None,
        Box::new(|width: u32, height: u32| {
            assert_eq!((width, height), (120, 240));
            annotation(
                width,
                height,
                vec![
                    paragraph(vec![word("top", 5, 10, BreakType::LineBreak)], (5, 10, 35, 30)),
                    paragraph(vec![word("low", 5, 150, BreakType::LineBreak)], (5, 150, 35, 170)),
                    paragraph(vec![word("end", 5, 200, BreakType::LineBreak)], (5, 200, 35, 220)),
                ],
            )
        }),
    );
    let config = PipelineConfig::new(dir.path().join("vision-cache")).with_montage_size(2);
    let outcome = RecognitionPipeline::new(config, recognizer.clone())
        .run(&[top.clone(), bottom.clone()])
        .await?;

    assert_eq!(recognizer.calls(), 1);
    let pages = outcome.into_pages()?;
    assert_eq!(pages.len(), 2);

    assert_eq!(pages[0].image, top);
    assert_eq!(pages[0].bbox, BBox::new(0, 0, 80, 100));
    assert_eq!(pages[0].paragraphs.len(), 1);
    assert_eq!(pages[0].paragraphs[0].bbox, BBox::new(5, 10, 35, 30));

    assert_eq!(pages[1].image, bottom);
    assert_eq!(pages[1].bbox, BBox::new(0, 0, 120, 140));
    let boxes: Vec<BBox> = pages[1].paragraphs.iter().map(|p| p.bbox).collect();
    assert_eq!(boxes, vec![BBox::new(5, 50, 35, 70), BBox::new(5, 100, 35, 120)]);
    assert_eq!(
        pages[1].paragraphs[0].lines[0].words[0].symbols[0].bbox,
        BBox::new(5, 50, 15, 70)
    );

    // Each member image gets its own cache entry.
    let cache = PageCache::new(dir.path().join("vision-cache"));
    assert_eq!(cache.load(&bottom).as_ref(), Some(&pages[1]));
    Ok(())
}

/// Integration test: an unreadable image is dropped before montages are formed
#[tokio::test]
async fn test_unreadable_image_leaves_montage_neighbours_intact() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = write_image(dir.path(), "001_ocr.png", 40, 30);
    let garbage = dir.path().join("002_ocr.png");
    fs::write(&garbage, b"definitely not a png")?;
    let third = write_image(dir.path(), "003_ocr.png", 60, 30);

    let recognizer = ScriptedRecognizer::new(
        None,
        Box::new(|width: u32, height: u32| {
            assert_eq!((width, height), (60, 60));
            annotation(
                width,
                height,
                vec![
                    paragraph(vec![word("one", 0, 5, BreakType::LineBreak)], (0, 5, 30, 25)),
                    paragraph(vec![word("three", 0, 35, BreakType::LineBreak)], (0, 35, 50, 55)),
                ],
            )
        }),
    );
    let config = PipelineConfig::new(dir.path().join("vision-cache")).with_montage_size(3);
    let outcome = RecognitionPipeline::new(config, recognizer.clone())
        .run(&[first.clone(), garbage.clone(), third.clone()])
        .await?;

    assert_eq!(recognizer.calls(), 1);
    let pages = outcome.into_pages()?;
    let converted: Vec<PathBuf> = pages.iter().map(|p| p.image.clone()).collect();
    assert_eq!(converted, vec![first.clone(), third.clone()]);
    assert_eq!(pages[1].paragraphs[0].bbox, BBox::new(0, 5, 50, 25));

    let cache = PageCache::new(dir.path().join("vision-cache"));
    assert!(cache.load(&first).is_some());
    assert!(cache.load(&third).is_some());
    assert!(cache.load(&garbage).is_none());
    Ok(())
}

/// Integration test: hyphenated words are joined in the plain text output
#[tokio::test]
async fn test_hyphenated_word_is_joined_in_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let image = write_image(dir.path(), "001_ocr.png", 200, 120);

    let recognizer = ScriptedRecognizer::new(
        None,
        Box::new(|width: u32, height: u32| {
            annotation(
                width,
                height,
                vec![
                    paragraph(
                        vec![
                            word("A", 0, 0, BreakType::Space),
                            word("title", 20, 0, BreakType::LineBreak),
                        ],
                        (0, 0, 70, 20),
                    ),
                    paragraph(
                        vec![
                            word("the", 0, 30, BreakType::Space),
                            word("com", 40, 30, BreakType::Hyphen),
                            word("puter", 0, 50, BreakType::Space),
                            word("works", 60, 50, BreakType::LineBreak),
                        ],
                        (0, 30, 110, 70),
                    ),
                    paragraph(vec![word("end", 0, 90, BreakType::EolSureSpace)], (0, 90, 30, 110)),
                ],
            )
        }),
    );

    let pages = RecognitionPipeline::new(
        PipelineConfig::new(dir.path().join("vision-cache")),
        recognizer,
    )
    .run(&[image])
    .await?
    .into_pages()?;

    assert_eq!(pages[0].paragraphs.len(), 3);
    assert_eq!(pages[0].paragraphs[1].lines.len(), 2);

    export_pages(&pages, dir.path(), &Cleaner::default())?;

    let text = fs::read_to_string(dir.path().join("vision-text").join("001_ocr.txt"))?;
    assert_eq!(text, "A title\n\nthe computer works\n\nend\n\n");

    let hocr = fs::read_to_string(dir.path().join("001_ocr_hocr.hocr"))?;
    assert!(hocr.contains(">com</span>"));
    assert!(hocr.contains(">puter</span>"));
    Ok(())
}
