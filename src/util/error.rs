//! Error types for scene assembly and BVH construction.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene and BVH operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A triangle references a vertex outside the mesh's vertex array
    #[error("Mesh '{mesh}': vertex index {index} out of bounds (vertex count: {vertex_count})")]
    InvalidMeshIndex {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    /// Leaf size below 1 or an inverted triangle range
    #[error("Invalid build parameter: {0}")]
    InvalidBuildParameter(String),

    /// The mesh loader could not parse a file
    #[error("Failed to load mesh {path}: {message}")]
    MeshLoad { path: PathBuf, message: String },

    /// Mesh handle does not address a loaded mesh
    #[error("Mesh index {index} out of bounds (count: {count})")]
    InvalidMeshHandle { index: usize, count: usize },

    /// Settings file exists but could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid build parameter error.
    pub fn build_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidBuildParameter(msg.into())
    }

    /// Create a mesh loading error for the given path.
    pub fn mesh_load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::MeshLoad {
            path: path.into(),
            message: msg.into(),
        }
    }
}

/// Result type alias for scene and BVH operations.
pub type Result<T> = std::result::Result<T, Error>;
