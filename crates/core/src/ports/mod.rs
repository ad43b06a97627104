pub mod finder;
pub mod repository;
pub mod volume;

// Re-exports
pub use finder::*;
pub use repository::*;
pub use volume::*;
