//! Error types for the NoteVault data model.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a repository.
#[derive(Debug, Error)]
pub enum ModelError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The repository was written by a newer schema version
    #[error("unsupported repository revision {found} (supported up to {supported})")]
    UnsupportedRevision {
        /// Revision found in the data.
        found: u32,
        /// Highest revision this build understands.
        supported: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::UnsupportedRevision {
            found: 9,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported repository revision 9 (supported up to 1)"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelError>();
    }
}
