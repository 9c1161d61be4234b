//! # Error Types

use crate::vocab::TokenCategory;

/// Errors from stabletok operations.
#[derive(Debug, thiserror::Error)]
pub enum StableTokError {
    /// Both the category range and the RARE fallback range are full.
    #[error("vocabulary capacity exceeded allocating a {category} token")]
    VocabularyCapacityExceeded {
        /// The category of the token that could not be placed.
        category: TokenCategory,
    },

    /// The stage id does not name a stage in the required state.
    #[error("unknown stage: {stage_id}")]
    UnknownStage {
        /// The offending stage id.
        stage_id: String,
    },

    /// The stage exists, but the requested transition is not permitted.
    #[error("stage {stage_id} is {status}; invalid transition")]
    InvalidState {
        /// The offending stage id.
        stage_id: String,

        /// The current status of the stage.
        status: String,
    },

    /// Vocabulary data is inconsistent.
    #[error("{0}")]
    VocabConflict(String),

    /// Token value out of range for the target type.
    #[error("token id {id} out of range for the token type")]
    TokenOutOfRange {
        /// The id which did not fit.
        id: u64,
    },

    /// Malformed vocabulary file or persisted state.
    #[error("format error: {0}")]
    Format(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for stabletok operations.
pub type STResult<T> = core::result::Result<T, StableTokError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StableTokError::VocabularyCapacityExceeded {
            category: TokenCategory::Subword,
        };
        assert_eq!(
            err.to_string(),
            "vocabulary capacity exceeded allocating a subword token"
        );

        let err = StableTokError::InvalidState {
            stage_id: "stage_1_0".to_string(),
            status: "pending".to_string(),
        };
        assert_eq!(err.to_string(), "stage stage_1_0 is pending; invalid transition");
    }
}
