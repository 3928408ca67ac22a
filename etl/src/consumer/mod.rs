//! Final stages that receive whole records.

mod base;
mod shared;
mod transform;

pub use base::Consumer;
pub use shared::SharedConsumer;
pub use transform::TransformConsumer;
