//! Bookshelf application library
//!
//! Wires the book catalogue module onto the kernel, database and HTTP
//! crates. The binaries in this workspace are thin wrappers over [`app`].

pub mod app;
pub mod modules;

/// Re-export commonly used types
pub use modules::*;
