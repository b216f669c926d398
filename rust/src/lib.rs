pub mod bitio;
pub mod bzip2;
pub mod error;
pub mod extract;
pub mod locate;
#[cfg(feature = "python")]
pub(crate) mod python;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bzip2::BlockSpan;
pub use error::{RecoverError, Result};
pub use extract::{load_block, load_block_from, load_block_to_vec};
pub use locate::{
    locate_blocks, locate_blocks_in, BlockMap, LocateOptions, SharedProgress, MAX_HANDLED_BLOCKS,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Performance sensitive functionality
#[cfg(feature = "python")]
#[pymodule]
fn _rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::init_module(m)?;

    pyo3_log::init();

    Ok(())
}
