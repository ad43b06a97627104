pub mod refs;
pub mod remote;
pub mod result;

// Re-exports for convenience
pub use refs::*;
pub use remote::*;
pub use result::*;
