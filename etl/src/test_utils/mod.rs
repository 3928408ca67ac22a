//! Shared fixtures for unit and integration tests.
//!
//! Provides a set of small record shapes that overlap in the ways stages usually do, and an
//! in-memory consumer that remembers everything it received.

pub mod consumer;
pub mod shapes;
