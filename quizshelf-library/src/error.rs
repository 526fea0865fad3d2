//! Error types for quizshelf-library
//!
//! `ImportError` covers everything that can go wrong between a package byte
//! source and a committed quiz. Inside an import session these errors never
//! escape to the caller; the coordinator wraps them in an `Error` state.

use thiserror::Error;

/// Import pipeline error
#[derive(Debug, Error)]
pub enum ImportError {
    /// Corrupt or incompatible package (decompression, marker, structure)
    #[error("Invalid package format: {0}")]
    Format(String),

    /// Referenced resource absent from both the package and the local store
    #[error("Resource '{resource}' requested by {requester} was not found")]
    ResourceMissing { resource: String, requester: String },

    /// I/O failure while copying a resource into the resource store
    #[error("Failed to write resource '{resource}': {source}")]
    ResourceWrite {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// Transaction-layer failure
    #[error("Store error: {0}")]
    Store(#[from] quizshelf_common::Error),

    /// Single-quiz import of a package with no quiz in it
    #[error("Package contains no quiz")]
    EmptyArchive,

    /// Single-quiz import of a package with more than one quiz
    #[error("Package contains {0} quizzes, expected exactly one")]
    MultipleQuizzes(usize),
}

impl From<sqlx::Error> for ImportError {
    fn from(err: sqlx::Error) -> Self {
        ImportError::Store(quizshelf_common::Error::Database(err))
    }
}

/// Result type for import pipeline operations
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_routes_through_store() {
        let err: ImportError = sqlx::Error::RowNotFound.into();
        assert!(matches!(
            err,
            ImportError::Store(quizshelf_common::Error::Database(_))
        ));
    }

    #[test]
    fn test_missing_resource_message_names_requester() {
        let err = ImportError::ResourceMissing {
            resource: "img1.png".to_string(),
            requester: "quiz 'Optics'".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("img1.png"));
        assert!(text.contains("Optics"));
    }
}
