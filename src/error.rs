use std::path::PathBuf;
use thiserror::Error;

/// Every way a run of the combiner can end unsuccessfully. All of them map to exit code 1.
#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Input folder '{}' does not exist.", .0.display())]
    InputNotFound(PathBuf),

    #[error("'{}' is not a directory.", .0.display())]
    NotADirectory(PathBuf),

    #[error("Could not list the content of '{}': {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No PDF files found in '{}'", .0.display())]
    NoPdfFiles(PathBuf),

    /// Anything that went wrong while loading, appending or writing documents.
    /// The underlying cause is kept as text, unclassified.
    #[error("Error combining PDF files: {0}")]
    MergeFailed(String),
}

impl CombineError {
    /// Errors detected before any work is done on the input directory.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CombineError::InputNotFound(_) | CombineError::NotADirectory(_)
        )
    }
}
