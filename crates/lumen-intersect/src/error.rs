//! Error types for primitive construction and configuration.
//!
//! A ray that misses is never an error; these variants only describe
//! contract violations caught while a scene is being assembled.

use thiserror::Error;

/// Errors raised while building rays, primitives or configuration.
#[derive(Error, Debug)]
pub enum IntersectError {
    /// Ray direction has zero length or is not finite.
    #[error("ray direction must be finite and non-zero")]
    ZeroDirection,

    /// Radius is negative, zero where a positive value is required, or not finite.
    #[error("invalid radius: {0}")]
    InvalidRadius(f64),

    /// Quadric height is not a positive finite number.
    #[error("invalid height: {0}")]
    InvalidHeight(f64),

    /// An axis or reference direction is zero-length or parallel to its partner.
    #[error("degenerate axis or reference direction")]
    DegenerateAxis,

    /// Triangle vertices are collinear or coincident.
    #[error("degenerate triangle: vertices are collinear")]
    DegenerateTriangle,

    /// Mesh index refers past the end of the vertex buffer.
    #[error("mesh index {index} out of bounds for {len} vertices")]
    MeshIndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Number of vertices in the mesh.
        len: usize,
    },

    /// Per-vertex attribute buffer does not match the vertex count.
    #[error("{what}: expected {expected} entries, got {got}")]
    AttributeCountMismatch {
        /// Which attribute buffer.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Configuration values out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for intersection-core construction.
pub type Result<T> = std::result::Result<T, IntersectError>;
