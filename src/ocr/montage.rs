use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::core::geometry::BBox;
use crate::ocr::OcrError;

/// Several page images stacked into one canvas so that a single recognition
/// call covers all of them.
///
/// `bounds[i]` is where `paths[i]` was drawn on the canvas and `y_limits[i]`
/// the canvas row just below it.
#[derive(Debug, Clone)]
pub struct Montage {
    pub image: DynamicImage,
    pub paths: Vec<PathBuf>,
    pub y_limits: Vec<i32>,
    pub bounds: Vec<BBox>,
}

impl Montage {
    /// Opens `paths` and stacks them top to bottom, left aligned, on a white
    /// canvas as wide as the widest image, then inverts the canvas colors.
    ///
    /// A single path is returned as is: no canvas and no inversion. Any
    /// image that fails to open fails the whole montage.
    pub fn create(paths: &[PathBuf]) -> Result<Self, OcrError> {
        if let [path] = paths {
            let image = open_image(path)?;
            let bounds = BBox::from_size(image.width(), image.height());
            return Ok(Self {
                image,
                paths: vec![path.clone()],
                y_limits: vec![bounds.y1],
                bounds: vec![bounds],
            });
        }

        let images = paths
            .iter()
            .map(|path| open_image(path))
            .collect::<Result<Vec<_>, _>>()?;

        let max_width = images.iter().map(|img| img.width()).max().unwrap_or(0);
        let total_height: u32 = images.iter().map(|img| img.height()).sum();

        let mut canvas = RgbaImage::from_pixel(max_width, total_height, Rgba([255, 255, 255, 255]));
        let mut y_offset = 0i32;
        let mut y_limits = Vec::with_capacity(images.len());
        let mut bounds = Vec::with_capacity(images.len());

        for img in &images {
            let height = img.height() as i32;
            imageops::overlay(&mut canvas, &img.to_rgba8(), 0, y_offset as i64);
            bounds.push(BBox::new(0, y_offset, img.width() as i32, y_offset + height));
            y_offset += height;
            y_limits.push(y_offset);
        }

        // Light text on a dark background recognizes noticeably better.
        imageops::invert(&mut canvas);

        Ok(Self {
            image: DynamicImage::ImageRgba8(canvas),
            paths: paths.to_vec(),
            y_limits,
            bounds,
        })
    }

    /// Unit identity: the file stems of the member images joined by `-`.
    pub fn name(&self) -> String {
        unit_name(&self.paths)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Canvases of one pixel or less in either direction carry no text.
    pub fn is_blank(&self) -> bool {
        self.image.width() <= 1 || self.image.height() <= 1
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, OcrError> {
        let mut buffer = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(OcrError::ImageEncode)?;
        Ok(buffer)
    }
}

fn open_image(path: &Path) -> Result<DynamicImage, OcrError> {
    image::open(path).map_err(|source| OcrError::ImageLoad {
        path: path.display().to_string(),
        source,
    })
}

/// Whether `path` decodes as an image larger than one pixel in both
/// directions. Only the header is read.
pub fn is_usable_image(path: &Path) -> bool {
    match image::image_dimensions(path) {
        Ok((width, height)) => width > 1 && height > 1,
        Err(_) => false,
    }
}

/// File stems of `paths` joined by `-`.
pub fn unit_name(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| file_stem(p))
        .collect::<Vec<_>>()
        .join("-")
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
