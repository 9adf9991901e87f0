use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::model::{Page, Paragraph};
use crate::export::Exporter;
use crate::ocr::montage::file_stem;
use crate::text::bidi::split_runs;
use crate::text::cleaner::Cleaner;

/// Writes one `<stem>.txt` per page.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
    cleaner: Cleaner,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf, cleaner: Cleaner) -> Self {
        Self { out_dir, cleaner }
    }
}

/// Plain text of a page: paragraphs separated by a blank line, mixed
/// direction paragraphs broken into one line per directional run.
pub fn page_to_text(page: &Page, cleaner: &Cleaner) -> String {
    let mut text = String::new();
    for paragraph in &page.paragraphs {
        let block = paragraph_to_text(paragraph);
        if block.is_empty() {
            continue;
        }
        text.push_str(&block);
        text.push_str("\n\n");
    }
    cleaner.clean(&text)
}

fn paragraph_to_text(paragraph: &Paragraph) -> String {
    let raw: String = paragraph
        .lines
        .iter()
        .flat_map(|line| line.words.iter())
        .map(|word| word.text())
        .collect();

    split_runs(&collapse_spaces(&raw))
        .iter()
        .map(|run| run.trim())
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !previous_space {
                out.push(c);
            }
            previous_space = true;
        } else {
            out.push(c);
            previous_space = false;
        }
    }
    out
}

impl Exporter for TextExporter {
    fn export(&self, pages: &[Page]) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        for page in pages {
            let name = file_stem(&page.image);
            let path = self.out_dir.join(format!("{name}.txt"));
            fs::write(&path, page_to_text(page, &self.cleaner))
                .with_context(|| format!("save text failed for {name:?}"))?;
        }
        Ok(())
    }
}
