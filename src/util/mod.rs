//! Shared utilities

pub mod cache;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod process;

pub use cache::Caches;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
