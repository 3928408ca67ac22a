//! Sources of records.

mod base;
mod iterator;
mod reader;

pub use base::Extractor;
pub use iterator::IteratorExtractor;
pub use reader::ReaderExtractor;
