//! Error types for the placement layer.

use delve_graph::{EntityId, GraphError, TemplateCategory};

/// Why a placement or removal did not happen.
///
/// `NoConnector` and `Collision` are ordinary outcomes of growing a dungeon
/// and are handled by retrying. `TemplateMissing` is a configuration problem.
/// `GraphInconsistency` means a caller asked for something the graph can't
/// honor; it is reported, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    /// The new entity has no free connection point to attach with.
    #[error("template '{template}' has no free connector")]
    NoConnector { template: String },

    /// After alignment the new entity overlaps an existing one.
    #[error("template '{template}' collides with {with}")]
    Collision { template: String, with: EntityId },

    /// The template source returned nothing for this category.
    #[error("no template available for {0}")]
    TemplateMissing(TemplateCategory),

    /// The request doesn't match the graph (unknown entity, wrong parent
    /// category, connector not reserved, ...).
    #[error("graph inconsistency: {0}")]
    GraphInconsistency(String),
}

impl PlacementError {
    /// `true` for failures that a retry at the same connector may fix.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoConnector { .. } | Self::Collision { .. })
    }
}

impl From<GraphError> for PlacementError {
    fn from(err: GraphError) -> Self {
        Self::GraphInconsistency(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(PlacementError::NoConnector { template: "a".into() }.is_recoverable());
        assert!(
            PlacementError::Collision { template: "a".into(), with: EntityId(1) }.is_recoverable()
        );
        assert!(!PlacementError::TemplateMissing(TemplateCategory::Room).is_recoverable());
        assert!(!PlacementError::GraphInconsistency("x".into()).is_recoverable());
    }

    #[test]
    fn test_from_graph_error() {
        let err: PlacementError = GraphError::UnknownEntity(EntityId(4)).into();
        assert!(matches!(err, PlacementError::GraphInconsistency(_)));
        assert!(err.to_string().contains("E-4"));
    }
}
