//! Unicode clean-up applied to recognized text before it is written out.
//!
//! A [`Cleaner`] always decomposes its input canonically (NFD), runs the
//! selected [`Transformer`]s in order, then recomposes (NFC). Every
//! transformer only ever produces characters that it and the other
//! transformers leave alone, which keeps `clean` idempotent.

use std::borrow::Cow;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const HYPHENS: &[char] = &[
    '\u{002D}', // Hyphen-Minus
    '\u{2010}', // Hyphen
    '\u{2011}', // Non-Breaking Hyphen
    '\u{FE63}', // Small Hyphen-Minus
    '\u{FF0D}', // Fullwidth Hyphen-Minus
    '\u{2012}', // Figure Dash
    '\u{2013}', // En Dash
];

const DASHES: &[char] = &[
    '\u{2014}', // Em Dash
    '\u{2E3A}', // Two-Em Dash
    '\u{2E3B}', // Three-Em Dash
    '\u{FE58}', // Small Em Dash
];

const APOSTROPHES: &[char] = &[
    '\u{0027}', // Apostrophe
    '\u{02BC}', // Modifier Letter Apostrophe
    '\u{055A}', // Armenian Apostrophe
    '\u{07F4}', // Nko High Tone Apostrophe
    '\u{07F5}', // Nko Low Tone Apostrophe
    '\u{FF07}', // Fullwidth Apostrophe
    '\u{2018}', // Left Single Quotation Mark
    '\u{2019}', // Right Single Quotation Mark
    '\u{201A}', // Single Low-9 Quotation Mark
    '\u{201B}', // Single High-Reversed-9 Quotation Mark
    '\u{275B}', // Heavy Single Turned Comma Quotation Mark Ornament
    '\u{275C}', // Heavy Single Comma Quotation Mark Ornament
    '\u{275F}', // Heavy Low Single Comma Quotation Mark Ornament
    '\u{02B9}', // Modifier Letter Prime
    '\u{2032}', // Prime
    '\u{2035}', // Reversed Prime
    '\u{02BB}', // Modifier Letter Turned Comma
    '\u{A78B}', // Latin Capital Letter Saltillo
    '\u{A78C}', // Latin Small Letter Saltillo
    '\u{0060}', // Grave Accent
    '\u{00B4}', // Acute Accent
    '\u{02CA}', // Modifier Letter Acute Accent
    '\u{02CB}', // Modifier Letter Grave Accent
    '\u{02CE}', // Modifier Letter Low Grave Accent
    '\u{02CF}', // Modifier Letter Low Acute Accent
    '\u{02F4}', // Modifier Letter Middle Grave Accent
];

const QUOTATIONS: &[char] = &[
    '\u{0022}', // Quotation Mark
    '\u{02EE}', // Modifier Letter Double Apostrophe
    '\u{201C}', // Left Double Quotation Mark
    '\u{201D}', // Right Double Quotation Mark
    '\u{201E}', // Double Low-9 Quotation Mark
    '\u{201F}', // Double High-Reversed-9 Quotation Mark
    '\u{275D}', // Heavy Double Turned Comma Quotation Mark Ornament
    '\u{275E}', // Heavy Double Comma Quotation Mark Ornament
    '\u{2760}', // Heavy Low Double Comma Quotation Mark Ornament
    '\u{2E42}', // Double Low-Reversed-9 Quotation Mark
    '\u{301D}', // Reversed Double Prime Quotation Mark
    '\u{301E}', // Double Prime Quotation Mark
    '\u{301F}', // Low Double Prime Quotation Mark
    '\u{FF02}', // Fullwidth Quotation Mark
    '\u{02BA}', // Modifier Letter Double Prime
    '\u{2033}', // Double Prime
    '\u{2036}', // Reversed Double Prime
    '\u{02DD}', // Double Acute Accent
    '\u{02F5}', // Modifier Letter Middle Double Grave Accent
    '\u{02F6}', // Modifier Letter Middle Double Acute Accent
];

const SUBSCRIPT_DIGITS: &[(char, char)] = &[
    ('\u{2080}', '0'),
    ('\u{2081}', '1'),
    ('\u{2082}', '2'),
    ('\u{2083}', '3'),
    ('\u{2084}', '4'),
    ('\u{2085}', '5'),
    ('\u{2086}', '6'),
    ('\u{2087}', '7'),
    ('\u{2088}', '8'),
    ('\u{2089}', '9'),
];

const SUPERSCRIPT_DIGITS: &[(char, char)] = &[
    ('\u{2070}', '0'),
    ('\u{00B9}', '1'),
    ('\u{00B2}', '2'),
    ('\u{00B3}', '3'),
    ('\u{2074}', '4'),
    ('\u{2075}', '5'),
    ('\u{2076}', '6'),
    ('\u{2077}', '7'),
    ('\u{2078}', '8'),
    ('\u{2079}', '9'),
];

// Letter blocks of the Latin script. Digits and punctuation are excluded.
const LATIN_RANGES: &[(char, char)] = &[
    ('A', 'Z'),
    ('a', 'z'),
    ('\u{00AA}', '\u{00AA}'),
    ('\u{00BA}', '\u{00BA}'),
    ('\u{00C0}', '\u{00D6}'),
    ('\u{00D8}', '\u{00F6}'),
    ('\u{00F8}', '\u{02AF}'),
    ('\u{1D00}', '\u{1D7F}'),
    ('\u{1E00}', '\u{1EFF}'),
    ('\u{2C60}', '\u{2C7F}'),
    ('\u{A720}', '\u{A7FF}'),
    ('\u{AB30}', '\u{AB6F}'),
    ('\u{FB00}', '\u{FB06}'),
    ('\u{FF21}', '\u{FF3A}'),
    ('\u{FF41}', '\u{FF5A}'),
];

fn is_latin_letter(c: char) -> bool {
    LATIN_RANGES.iter().any(|&(lo, hi)| lo <= c && c <= hi)
}

fn lookup(table: &[(char, char)], c: char) -> char {
    table
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

/// One clean-up step, applied to canonically decomposed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transformer {
    /// Drop every combining mark.
    Diacritic,
    /// Drop combining marks attached to a Latin letter only.
    LatinDiacritic,
    SubscriptNumber,
    SuperscriptNumber,
    /// Hyphen variants and en/figure dashes to `-`.
    Hyphen,
    /// Em dash variants to U+2014.
    Dash,
    /// Apostrophe-like marks to `'`.
    Apostrophe,
    /// Double quotation variants to `"`.
    Quotation,
}

impl Transformer {
    pub const ALL: [Transformer; 8] = [
        Transformer::Diacritic,
        Transformer::LatinDiacritic,
        Transformer::SubscriptNumber,
        Transformer::SuperscriptNumber,
        Transformer::Hyphen,
        Transformer::Dash,
        Transformer::Apostrophe,
        Transformer::Quotation,
    ];

    /// Maps a single code point. Returns `None` when the code point is removed.
    pub fn map_char(&self, c: char) -> Option<char> {
        let mapped = match self {
            Transformer::Diacritic | Transformer::LatinDiacritic => {
                if is_combining_mark(c) {
                    return None;
                }
                c
            }
            Transformer::SubscriptNumber => lookup(SUBSCRIPT_DIGITS, c),
            Transformer::SuperscriptNumber => lookup(SUPERSCRIPT_DIGITS, c),
            Transformer::Hyphen if HYPHENS.contains(&c) => '-',
            Transformer::Dash if DASHES.contains(&c) => '\u{2014}',
            Transformer::Apostrophe if APOSTROPHES.contains(&c) => '\'',
            Transformer::Quotation if QUOTATIONS.contains(&c) => '"',
            _ => c,
        };
        Some(mapped)
    }

    pub fn apply(&self, input: &str) -> String {
        match self {
            Transformer::LatinDiacritic => strip_latin_marks(input),
            _ => input.chars().filter_map(|c| self.map_char(c)).collect(),
        }
    }
}

fn strip_latin_marks(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut after_latin = false;
    for c in input.chars() {
        if is_combining_mark(c) {
            if !after_latin {
                out.push(c);
            }
            continue;
        }
        after_latin = is_latin_letter(c);
        out.push(c);
    }
    out
}

/// Ordered chain of transformers between an NFD and an NFC pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cleaner {
    transformers: Vec<Transformer>,
}

impl Cleaner {
    pub fn new(transformers: Vec<Transformer>) -> Self {
        Self { transformers }
    }

    pub fn transformers(&self) -> &[Transformer] {
        &self.transformers
    }

    pub fn clean(&self, input: &str) -> String {
        let decomposed: String = input.nfd().collect();
        let mapped = self
            .transformers
            .iter()
            .fold(decomposed, |text, t| t.apply(&text));
        mapped.nfc().collect()
    }

    /// Cleans raw bytes. Input that is not valid UTF-8 is returned untouched.
    pub fn clean_bytes<'a>(&self, input: &'a [u8]) -> Cow<'a, [u8]> {
        match std::str::from_utf8(input) {
            Ok(text) => Cow::Owned(self.clean(text).into_bytes()),
            Err(_) => Cow::Borrowed(input),
        }
    }
}

/// Which transformer categories to enable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanerOptions {
    pub no_diacritic: bool,
    pub no_latin_diacritic: bool,
    pub norm_sub_number: bool,
    pub norm_super_number: bool,
    pub norm_hyphen: bool,
    pub norm_dash: bool,
    pub norm_apostrophe: bool,
    pub norm_quotation: bool,
}

impl CleanerOptions {
    pub fn with_numbers(mut self) -> Self {
        self.norm_sub_number = true;
        self.norm_super_number = true;
        self
    }

    pub fn with_marks(mut self) -> Self {
        self.norm_hyphen = true;
        self.norm_dash = true;
        self.norm_apostrophe = true;
        self.norm_quotation = true;
        self
    }

    pub fn transformers(&self) -> Vec<Transformer> {
        let mut out = Vec::new();
        if self.no_diacritic {
            out.push(Transformer::Diacritic);
        } else if self.no_latin_diacritic {
            out.push(Transformer::LatinDiacritic);
        }

        let flags = [
            (self.norm_sub_number, Transformer::SubscriptNumber),
            (self.norm_super_number, Transformer::SuperscriptNumber),
            (self.norm_hyphen, Transformer::Hyphen),
            (self.norm_dash, Transformer::Dash),
            (self.norm_apostrophe, Transformer::Apostrophe),
            (self.norm_quotation, Transformer::Quotation),
        ];
        out.extend(flags.iter().filter(|(on, _)| *on).map(|(_, t)| *t));
        out
    }

    pub fn build(&self) -> Cleaner {
        Cleaner::new(self.transformers())
    }
}
