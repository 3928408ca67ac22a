//! Typed record envelopes and stage lifecycle for small extract-transform-load pipelines.
//!
//! Records travel between stages as a [`record::RecordEnvelope`]: a flat store of
//! path-addressed cells that every stage reads and writes through its own [`record::Shape`].
//! Fields a stage does not declare survive its writes untouched, so stages only need to agree
//! on the fields they share.
//!
//! A [`pipeline::Pipeline`] pulls values from an [`extractor::Extractor`] and hands them to a
//! [`consumer::Consumer`] through an [`executor::Executor`], recording counts and times into
//! [`metrics::EtlMetrics`] scopes on the way.

pub mod consumer;
pub mod conversions;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod lookup;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod record;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transformer;
