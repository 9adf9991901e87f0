use crate::core::geometry::BBox;
use crate::core::model::{
    is_line_break, Line, Page, Paragraph, Symbol, Word, HYPHEN_BREAK, HYPHEN_BREAK_KEPT,
    LINE_BREAK, SPACE_BREAK,
};
use crate::ocr::annotation::{
    AnnotatedParagraph, AnnotatedSymbol, AnnotatedWord, BoundingPoly, BreakType, TextAnnotation,
};
use crate::ocr::montage::Montage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Keep the `-` glyph of a hyphenated line break.
    pub keep_hyphen: bool,
    /// Glue words the service split without any break between them.
    pub merge_fragments: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            keep_hyphen: false,
            merge_fragments: true,
        }
    }
}

/// Rebuilds the paragraph / line / word / symbol hierarchy from a document
/// text annotation.
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    options: LayoutOptions,
}

impl LayoutBuilder {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// Flattens every block of every annotated page into one paragraph list,
    /// in response order.
    pub fn paragraphs(&self, annotation: &TextAnnotation) -> Vec<Paragraph> {
        annotation
            .pages
            .iter()
            .flat_map(|page| page.blocks.iter())
            .flat_map(|block| block.paragraphs.iter())
            .map(|paragraph| self.build_paragraph(paragraph))
            .collect()
    }

    pub fn build_paragraph(&self, paragraph: &AnnotatedParagraph) -> Paragraph {
        let words: Vec<Word> = paragraph
            .words
            .iter()
            .filter_map(|word| build_word(word, self.options.keep_hyphen))
            .collect();

        let words = if self.options.merge_fragments {
            merge_fragments(words)
        } else {
            words
        };

        Paragraph {
            lines: segment_lines(&words),
            bbox: poly_to_bbox(paragraph.bounding_box.as_ref()),
        }
    }

    /// Turns an annotation of `montage`'s canvas into one page per member
    /// image, each expressed in that image's own coordinates.
    ///
    /// Returns `None` when the annotation holds no page at all.
    pub fn build_pages(&self, annotation: &TextAnnotation, montage: &Montage) -> Option<Vec<Page>> {
        if annotation.pages.is_empty() {
            return None;
        }
        Some(split_pages(self.paragraphs(annotation), montage))
    }
}

/// Axis-aligned box of a four-vertex polygon, from vertex 0 (top-left) to
/// vertex 2 (bottom-right). Anything else yields an empty box.
pub fn poly_to_bbox(poly: Option<&BoundingPoly>) -> BBox {
    match poly.map(|p| p.vertices.as_slice()) {
        Some([min, _, max, _]) => BBox::new(min.x, min.y, max.x, max.y),
        _ => BBox::default(),
    }
}

/// Prefix and suffix markers for a symbol's detected break.
pub fn break_markers(symbol: &AnnotatedSymbol, keep_hyphen: bool) -> (String, String) {
    let Some(detected) = symbol.detected_break() else {
        return (String::new(), String::new());
    };

    let marker = match detected.kind {
        BreakType::Hyphen if keep_hyphen => HYPHEN_BREAK_KEPT,
        BreakType::Hyphen => HYPHEN_BREAK,
        BreakType::LineBreak | BreakType::EolSureSpace => LINE_BREAK,
        _ => SPACE_BREAK,
    };

    if detected.is_prefix {
        (marker.to_string(), String::new())
    } else {
        (String::new(), marker.to_string())
    }
}

/// Builds a word from its symbols, hoisting the first symbol's prefix and
/// the last symbol's suffix onto the word. Words without symbols are dropped.
pub fn build_word(word: &AnnotatedWord, keep_hyphen: bool) -> Option<Word> {
    let mut symbols: Vec<Symbol> = word
        .symbols
        .iter()
        .map(|symbol| {
            let (prefix, suffix) = break_markers(symbol, keep_hyphen);
            Symbol {
                text: symbol.text.clone(),
                prefix,
                suffix,
                bbox: poly_to_bbox(symbol.bounding_box.as_ref()),
            }
        })
        .collect();

    let prefix = std::mem::take(&mut symbols.first_mut()?.prefix);
    let suffix = symbols
        .last_mut()
        .map(|s| std::mem::take(&mut s.suffix))
        .unwrap_or_default();

    Some(Word {
        symbols,
        prefix,
        suffix,
        bbox: poly_to_bbox(word.bounding_box.as_ref()),
    })
}

/// Glues each word onto the previous one when no break separates them.
pub fn merge_fragments(words: Vec<Word>) -> Vec<Word> {
    let mut merged: Vec<Word> = Vec::with_capacity(words.len());
    for word in words {
        match merged.last_mut() {
            Some(last) if last.suffix.is_empty() && word.prefix.is_empty() => {
                last.symbols.extend(word.symbols);
                last.bbox = last.bbox.union(&word.bbox);
                last.suffix = word.suffix;
            }
            _ => merged.push(word),
        }
    }
    merged
}

/// Cuts a paragraph's words into lines. The break between two words is the
/// previous word's suffix followed by the current word's prefix; a new line
/// starts wherever it holds a line-break sentinel.
pub fn segment_lines(words: &[Word]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut cursor = 0;

    for i in 1..words.len() {
        let boundary = format!("{}{}", words[i - 1].suffix, words[i].prefix);
        if is_line_break(&boundary) {
            lines.push(Line::from_words(words[cursor..i].to_vec()));
            cursor = i;
        }
    }
    if cursor < words.len() {
        lines.push(Line::from_words(words[cursor..].to_vec()));
    }

    lines.retain(|line| !line.words.is_empty());
    lines
}

/// Index of the member image owning a paragraph: the first one whose bottom
/// edge lies below the paragraph's vertical center.
fn owner_of(paragraph: &Paragraph, y_limits: &[i32]) -> usize {
    let (_, center_y) = paragraph.bbox.center();
    y_limits
        .iter()
        .position(|limit| center_y < *limit)
        .unwrap_or(y_limits.len().saturating_sub(1))
}

/// Distributes canvas paragraphs over the montage's member images and moves
/// each page into its image's coordinate frame.
pub fn split_pages(paragraphs: Vec<Paragraph>, montage: &Montage) -> Vec<Page> {
    let mut buckets: Vec<Vec<Paragraph>> = vec![Vec::new(); montage.len()];
    if buckets.is_empty() {
        return Vec::new();
    }
    let last = buckets.len() - 1;
    for paragraph in paragraphs {
        let owner = owner_of(&paragraph, &montage.y_limits).min(last);
        buckets[owner].push(paragraph);
    }

    montage
        .paths
        .iter()
        .zip(montage.bounds.iter())
        .zip(buckets)
        .map(|((path, bounds), paragraphs)| {
            Page {
                image: path.clone(),
                paragraphs,
                bbox: *bounds,
            }
            .translate(0, -bounds.y0)
        })
        .collect()
}
