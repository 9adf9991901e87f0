use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::geometry::BBox;
use crate::core::model::{Line, Page};
use crate::export::Exporter;
use crate::ocr::montage::file_stem;
use crate::text::cleaner::Cleaner;

/// Writes one `<stem>_hocr.hocr` overlay per page.
#[derive(Debug, Clone)]
pub struct HocrExporter {
    out_dir: PathBuf,
    cleaner: Cleaner,
}

impl HocrExporter {
    pub fn new(out_dir: PathBuf, cleaner: Cleaner) -> Self {
        Self { out_dir, cleaner }
    }
}

/// A run of punctuation with no letter, digit or whitespace in it.
fn is_symbol_only(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

struct WordSpan {
    text: String,
    bbox: BBox,
}

/// Word spans of one line. Punctuation-only words are appended to the
/// preceding span of the line (and a word following a punctuation-only
/// span joins it), growing that span's box to cover both.
fn line_spans(line: &Line, cleaner: &Cleaner) -> Vec<WordSpan> {
    let mut spans: Vec<WordSpan> = Vec::with_capacity(line.words.len());
    for word in &line.words {
        let text = cleaner.clean(&word.text()).trim().to_string();
        if text.is_empty() {
            continue;
        }
        if let Some(previous) = spans.last_mut() {
            if is_symbol_only(&previous.text) || is_symbol_only(&text) {
                previous.text.push_str(&text);
                previous.bbox = previous.bbox.union(&word.bbox);
                continue;
            }
        }
        spans.push(WordSpan {
            text,
            bbox: word.bbox,
        });
    }
    spans
}

pub fn page_to_hocr(page: &Page, cleaner: &Cleaner) -> String {
    let mut paragraph_id = 0;
    let mut line_id = 0;
    let mut word_id = 0;
    let mut body = String::new();

    for paragraph in &page.paragraphs {
        paragraph_id += 1;
        let bbox = paragraph.bbox.to_hocr();
        body.push_str(&format!(
            "<div class='ocr_carea' id='block_1_{paragraph_id}' title='{bbox}'>\n<p class='ocr_par' id='par_1_{paragraph_id}' title='{bbox}'>\n"
        ));

        for line in &paragraph.lines {
            line_id += 1;
            body.push_str(&format!(
                "<span class='ocr_line' id='line_1_{line_id}' title='{}'>",
                line.bbox.to_hocr()
            ));
            for span in line_spans(line, cleaner) {
                word_id += 1;
                body.push_str(&format!(
                    "<span class='ocrx_word' id='word_1_{word_id}' title='{}'>{}</span>",
                    span.bbox.to_hocr(),
                    html_escape::encode_text(&span.text),
                ));
            }
            body.push_str("</span>\n");
        }

        body.push_str("</p>\n</div>\n");
    }

    format!(
        r#"<html xmlns='http://www.w3.org/1999/xhtml' xml:lang='en' lang='en'>
<head>
<meta http-equiv='Content-Type' content='text/html;charset=utf-8' />
<meta name='ocr-system' content='Google Vision' />
<meta name='ocr-capabilities' content='ocr_page ocr_carea ocr_par ocr_line ocrx_word' />
</head>
<body>
<div class='ocr_page' id='page_1' title='{page_bbox}'>
{body}</div>
</body>
</html>
"#,
        page_bbox = page.bbox.to_hocr(),
        body = body,
    )
}

impl Exporter for HocrExporter {
    fn export(&self, pages: &[Page]) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        for page in pages {
            let name = file_stem(&page.image);
            let path = self.out_dir.join(format!("{name}_hocr.hocr"));
            fs::write(&path, page_to_hocr(page, &self.cleaner))
                .with_context(|| format!("save HOCR failed for {name:?}"))?;
        }
        Ok(())
    }
}
