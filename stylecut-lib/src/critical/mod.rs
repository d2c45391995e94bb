pub mod extractor;
pub mod loader;
pub mod selectors;

pub use extractor::{CriticalCssExtractor, ExtractionMetrics, ExtractionResult};
pub use selectors::CriticalSelectorSet;
