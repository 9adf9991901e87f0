pub mod hocr_export;
pub mod text_export;

use anyhow::Result;

use crate::core::model::Page;

pub use hocr_export::{page_to_hocr, HocrExporter};
pub use text_export::{page_to_text, TextExporter};

pub trait Exporter {
    fn export(&self, pages: &[Page]) -> Result<()>;
}
