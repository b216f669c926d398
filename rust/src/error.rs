use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecoverError {
    #[error("Could not open {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Output buffer full; needed={needed}, capacity={capacity}")]
    OutputBufferFull { needed: u64, capacity: u64 },
    #[error("No usable blocks found")]
    NoUsableBlocks,
    #[error("More candidate blocks than the supported maximum of {limit}")]
    CapacityExceeded { limit: usize },
    #[error("Invalid block span; start={start}, end={end}")]
    InvalidSpan { start: u64, end: u64 },
    #[error("Input ended at bit {reached} before block end bit {end}")]
    TruncatedBlock { reached: u64, end: u64 },
}

pub type Result<T> = std::result::Result<T, RecoverError>;
