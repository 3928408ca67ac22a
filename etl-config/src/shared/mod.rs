mod base;
mod pipeline;

pub use base::*;
pub use pipeline::*;
