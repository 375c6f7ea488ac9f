//! Unified error type for Delve.

use delve_graph::GraphError;
use delve_placement::PlacementError;

/// Errors raised while loading configuration or catalogs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for the expected shape.
    #[cfg(feature = "json")]
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but describes something unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DelveError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The session has ended; growth and task reports are refused.
    #[error("session has ended")]
    SessionEnded,

    /// The session actor is gone (channel closed).
    #[error("session unavailable")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use delve_graph::{EntityId, TemplateCategory};

    use super::*;

    #[test]
    fn test_from_graph_error() {
        let err: DelveError = GraphError::UnknownEntity(EntityId(3)).into();
        assert!(matches!(err, DelveError::Graph(_)));
        assert!(err.to_string().contains("E-3"));
    }

    #[test]
    fn test_from_placement_error() {
        let err: DelveError = PlacementError::TemplateMissing(TemplateCategory::Hallway).into();
        assert!(matches!(err, DelveError::Placement(_)));
        assert!(err.to_string().contains("Hallway"));
    }

    #[test]
    fn test_from_config_error() {
        let err: DelveError = ConfigError::Invalid("empty catalog".into()).into();
        assert!(matches!(err, DelveError::Config(_)));
    }
}
