pub mod filters;
pub mod inverted;
pub mod metadata;

pub use filters::SearchFilters;
pub use inverted::InvertedIndex;
pub use metadata::MetadataIndex;
