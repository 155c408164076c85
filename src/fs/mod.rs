//! Read-only file tree access for materialized projects
//!
//! Extractors never touch `std::fs` directly; they go through a
//! [`FileSystem`] so tests can run against an in-memory tree.

mod mock;
mod real;
mod r#trait;

pub use mock::MockFileSystem;
pub use r#trait::{DirEntry, FileSystem, FileType};
pub use real::RealFileSystem;
