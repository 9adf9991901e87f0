pub mod annotation;
pub mod bridge;
pub mod cache;
pub mod layout_builder;
pub mod montage;

pub use annotation::TextAnnotation;
pub use bridge::{VisionBridge, VisionConfig};
pub use cache::PageCache;
pub use layout_builder::{LayoutBuilder, LayoutOptions};
pub use montage::Montage;

use async_trait::async_trait;

/// Errors raised while producing pages for one unit of work.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("recognition service error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache I/O error for {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache entry: {0}")]
    CacheEncode(#[from] serde_json::Error),

    #[error("worker task failed: {0}")]
    Task(String),
}

/// Remote document-recognition service.
///
/// Receives one encoded raster image and returns the document annotation, or
/// `None` when the service found no text at all.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image_png: &[u8]) -> Result<Option<TextAnnotation>, OcrError>;
}
