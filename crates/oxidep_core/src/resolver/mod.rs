//! Specifier resolution.
//!
//! A [`ResolverManager`] owns one [`ModuleResolver`] per workspace package plus a root resolver,
//! and the shared [`FileIndex`] used for extensionless lookups.

mod error;
mod file_index;
mod manager;
mod module_resolver;

pub use error::ResolutionError;
pub use file_index::FileIndex;
pub use manager::{ResolverManager, RootParams};
pub use module_resolver::{ModuleResolver, Resolved, is_relative_request};
