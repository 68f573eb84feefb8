use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McError {
    #[error("Invalid run parameter: {0}")]
    Config(String),

    #[error("Overlap in initial configuration")]
    InitialOverlap,

    #[error("Overlap in final configuration: acceptance engine let an overlapping move through")]
    FinalOverlap,

    #[error("Observable set mismatch: expected {expected:?}, found {found:?}")]
    ObservableMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Averaging lifecycle error: {0}")]
    AveragingState(&'static str),

    #[error("Block {block} ended without any samples")]
    EmptyBlock { block: usize },

    #[error("Dimension mismatch: {positions} positions but {orientations} orientations")]
    DimensionMismatch {
        positions: usize,
        orientations: usize,
    },

    #[error("Box too small: box length {box_length} must be at least twice the interaction range {range}")]
    BoxTooSmall { box_length: f64, range: f64 },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, McError>;
