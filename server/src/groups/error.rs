//! Group Tree Error Types

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Bounds, parent links or layer caches contradict each other.
    #[error("Invalid tree state: {0}")]
    InvalidTreeState(String),

    #[error("Group not found: {0}")]
    UnknownGroup(Uuid),

    /// Tree queries must not be asked about soft-deleted groups.
    #[error("Group {0} is deleted")]
    DeletedGroup(Uuid),

    #[error("Group type {child_type} is not allowed below {parent_type}")]
    TypeNotAllowed {
        parent_type: String,
        child_type: String,
    },

    #[error("Group type {0} cannot be the root of the tree")]
    NotARootType(String),

    #[error("Unknown group type: {0}")]
    UnknownGroupType(String),

    #[error("Unknown role type: {0}")]
    UnknownRoleType(String),

    #[error("The root group cannot be deleted")]
    RootProtected,
}

impl TreeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidTreeState(message.into())
    }
}
