//! Errors raised by the persistence layer

/// Failure talking to the backing store.
///
/// Every variant is a server-side fault; absence of a row is never an
/// error at this level.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },
}

impl PersistenceError {
    /// Name of the violated constraint, if the store reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            PersistenceError::Sqlx(sqlx::Error::Database(db)) => db.constraint(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_reported_as_database_error() {
        let err = PersistenceError::from(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("database error"));
        assert_eq!(err.constraint(), None);
    }

    #[test]
    fn migration_error_names_module_and_id() {
        let err = PersistenceError::Migration {
            module: "books".to_string(),
            id: "001_init".to_string(),
            source: sqlx::Error::PoolTimedOut,
        };
        assert!(err.to_string().contains("books/001_init"));
    }
}
