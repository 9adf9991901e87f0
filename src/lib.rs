pub mod core;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod text;

pub use core::model::{Line, Page, Paragraph, Symbol, Word};
pub use pipeline::{PipelineConfig, PipelineError, RecognitionPipeline, RunOutcome};
