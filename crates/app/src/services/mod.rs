pub mod resolver;

pub use resolver::{resolve_all, Resolver};
