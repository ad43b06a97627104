//! repofinder application library
//!
//! Concrete finders, the adapters they run on, and the aggregation service.
//! Exposed as a library so integration tests can drive the finders directly.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod report;
pub mod services;
