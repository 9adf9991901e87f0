use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::core::model::Page;
use crate::ocr::montage::file_stem;
use crate::ocr::OcrError;

/// On-disk store of recognized pages, one JSON file per source image.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File-system safe key for an image. Stems made only of
    /// `[A-Za-z0-9._-]` are used as is. Any other stem has those characters
    /// replaced by `_` and gets `~` plus a short digest of the raw stem, so
    /// two stems that sanitize alike keep distinct entries.
    pub fn key(image: &Path) -> String {
        let stem = file_stem(image);
        let safe: String = stem
            .chars()
            .map(|c| if is_safe(c) { c } else { '_' })
            .collect();
        if safe == stem {
            return safe;
        }

        let mut hasher = Sha256::new();
        hasher.update(stem.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        format!("{safe}~{}", &digest[..8])
    }

    pub fn entry_path(&self, image: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(image)))
    }

    /// Cached page for `image`, if an entry exists, decodes and was
    /// recorded for that same image path.
    pub fn load(&self, image: &Path) -> Option<Page> {
        let data = fs::read(self.entry_path(image)).ok()?;
        match serde_json::from_slice::<Page>(&data) {
            Ok(page) if page.image == image => Some(page),
            Ok(page) => {
                tracing::debug!(
                    "cache entry for {} belongs to {}",
                    image.display(),
                    page.image.display()
                );
                None
            }
            Err(err) => {
                tracing::debug!("ignoring unreadable cache entry for {}: {err}", image.display());
                None
            }
        }
    }

    pub fn store(&self, page: &Page) -> Result<(), OcrError> {
        let path = self.entry_path(&page.image);
        let io_err = |source| OcrError::CacheIo {
            path: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let data = serde_json::to_vec_pretty(page)?;
        fs::write(&path, data).map_err(io_err)?;
        Ok(())
    }
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}
