//! Error types for the content model.

use thiserror::Error;

/// Errors raised while resolving page content declarations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// An extra-field declaration names a field the page does not have.
    #[error("page '{page}' has no field '{field}'")]
    UnknownField { page: String, field: String },

    /// An extra-field path names a relation the page does not have.
    #[error("page '{page}' has no relation '{relation}'")]
    UnknownRelation { page: String, relation: String },

    /// Extra-field paths support at most one `relation.field` hop.
    #[error("extra field path '{path}' exceeds one relation level")]
    FieldPathTooDeep { path: String },
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::FieldPathTooDeep {
            path: "a.b.c".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "extra field path 'a.b.c' exceeds one relation level"
        );
    }
}
