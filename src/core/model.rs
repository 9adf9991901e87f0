use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::geometry::BBox;

/// Sentinel carried inside break markers to flag the end of a visual line.
/// It is never emitted; renderers strip it.
pub const NEWLINE_SENTINEL: char = '↵';

/// Marker for an ordinary inter-word space.
pub const SPACE_BREAK: &str = " ";
/// Marker for a line break (or a sure space at end of line).
pub const LINE_BREAK: &str = " ↵";
/// Marker for a hyphenated line break when the hyphen glyph is dropped.
pub const HYPHEN_BREAK: &str = "↵";
/// Marker for a hyphenated line break when the hyphen glyph is kept.
pub const HYPHEN_BREAK_KEPT: &str = "-↵";

pub fn is_line_break(marker: &str) -> bool {
    marker.contains(NEWLINE_SENTINEL)
}

/// Renders a break marker as emitted text.
pub fn render_break(marker: &str) -> String {
    marker.chars().filter(|c| *c != NEWLINE_SENTINEL).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub image: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraphs: Vec<Paragraph>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<Line>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Line {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Symbol>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
    pub bbox: BBox,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,
    pub bbox: BBox,
}

impl Page {
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            image: self.image.clone(),
            paragraphs: self.paragraphs.iter().map(|p| p.translate(dx, dy)).collect(),
            bbox: self.bbox.translate(dx, dy),
        }
    }

    /// Reorders paragraphs top to bottom by the vertical midpoint of their
    /// boxes. Stable, so paragraphs on the same row keep response order.
    /// Does not suit multi-column pages.
    pub fn sort_paragraphs_vertically(&mut self) {
        self.paragraphs.sort_by_key(|p| p.bbox.center().1);
    }
}

impl Paragraph {
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            lines: self.lines.iter().map(|l| l.translate(dx, dy)).collect(),
            bbox: self.bbox.translate(dx, dy),
        }
    }
}

impl Line {
    /// Builds a line whose box is the union of its words' boxes.
    pub fn from_words(words: Vec<Word>) -> Self {
        let bbox = words
            .iter()
            .fold(BBox::default(), |acc, w| acc.union(&w.bbox));
        Self { words, bbox }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            words: self.words.iter().map(|w| w.translate(dx, dy)).collect(),
            bbox: self.bbox.translate(dx, dy),
        }
    }
}

impl Word {
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            symbols: self.symbols.iter().map(|s| s.translate(dx, dy)).collect(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            bbox: self.bbox.translate(dx, dy),
        }
    }

    /// Text of the word with its break markers rendered.
    pub fn text(&self) -> String {
        let mut out = render_break(&self.prefix);
        for symbol in &self.symbols {
            out.push_str(&render_break(&symbol.prefix));
            out.push_str(&symbol.text);
            out.push_str(&render_break(&symbol.suffix));
        }
        out.push_str(&render_break(&self.suffix));
        out
    }
}

impl Symbol {
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            bbox: self.bbox.translate(dx, dy),
            ..self.clone()
        }
    }
}
