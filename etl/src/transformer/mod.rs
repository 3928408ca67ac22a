//! Stages that turn one value into zero or more values.

mod base;
mod filter;
mod map;

pub use base::Transformer;
pub use filter::{FilterTransformer, contains_filter};
pub use map::MapTransformer;
