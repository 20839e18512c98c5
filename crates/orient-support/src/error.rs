//! Error types for support estimation and orientation search.

use thiserror::Error;

/// Errors that can occur while building meshes or running a search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrientError {
    /// Malformed geometry (non-finite coordinates, bad index buffer).
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A search was started while another one is still in progress.
    #[error("an orientation search is already running")]
    AlreadyRunning,

    /// Invalid settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The search worker failed before producing a result.
    #[error("search failed: {0}")]
    SearchFailed(String),
}

/// Result type for orient operations.
pub type Result<T> = std::result::Result<T, OrientError>;
