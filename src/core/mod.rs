pub mod geometry;
pub mod model;

pub use geometry::BBox;
pub use model::{Line, Page, Paragraph, Symbol, Word};
