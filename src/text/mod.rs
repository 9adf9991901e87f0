pub mod bidi;
pub mod cleaner;

pub use bidi::{split_mixed_direction, split_runs};
pub use cleaner::{Cleaner, CleanerOptions, Transformer};
