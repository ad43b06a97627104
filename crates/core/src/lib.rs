//! repofinder core - pure domain logic with no filesystem access
//!
//! This crate contains the value types (remotes, finder results, ref names),
//! the total ordering over results, and the ports (interfaces) that
//! discovery sources implement. Finders that touch the filesystem, the
//! repository on disk, or the system mount table live in the app crate as
//! adapters.

pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
