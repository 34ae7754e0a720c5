//! Persistence plumbing for bookshelf.
//!
//! One [`Database`] owns the PostgreSQL pool for the lifetime of the
//! process. Work against it happens inside a [`Session`], a single
//! transaction that commits once on success and rolls back otherwise.
//! The connection returns to the pool on every exit path, including
//! drops caused by cancelled requests.

pub mod error;
pub mod pool;
pub mod schema;
pub mod session;

pub use error::PersistenceError;
pub use pool::Database;
pub use session::Session;
