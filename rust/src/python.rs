//! # Python bindings
//!
//! Exposes the block locator and extractor as
//! `bzrecover._rust.bzip2`. Both calls release the GIL while they touch
//! the file system; failures surface as `RecoverError(kind, message)`.

use pyo3::{create_exception, exceptions::PyException, prelude::*, types::PyBytes};
use std::path::PathBuf;

use crate::{
    load_block, locate_blocks, BlockSpan, LocateOptions, RecoverError, MAX_HANDLED_BLOCKS,
};

create_exception!(bzrecover.bzip2, PyRecoverError, PyException);

#[pyclass(eq, eq_int, name = "RecoverErrorKind", module = "bzrecover.bzip2")]
#[derive(Clone, Copy, Debug, PartialEq)]
enum PyRecoverErrorKind {
    Io,
    OutputBufferFull,
    NoUsableBlocks,
    CapacityExceeded,
    InvalidSpan,
    TruncatedBlock,
}

impl From<&RecoverError> for PyRecoverErrorKind {
    fn from(value: &RecoverError) -> Self {
        match value {
            RecoverError::Open { .. } | RecoverError::Io(_) => Self::Io,
            RecoverError::OutputBufferFull { .. } => Self::OutputBufferFull,
            RecoverError::NoUsableBlocks => Self::NoUsableBlocks,
            RecoverError::CapacityExceeded { .. } => Self::CapacityExceeded,
            RecoverError::InvalidSpan { .. } => Self::InvalidSpan,
            RecoverError::TruncatedBlock { .. } => Self::TruncatedBlock,
        }
    }
}

fn to_py_err(err: RecoverError) -> PyErr {
    PyRecoverError::new_err((PyRecoverErrorKind::from(&err), err.to_string()))
}

/// Locates bzip2 blocks in a file, returning `(start_bit, end_bit)` pairs
#[pyfunction(
    name = "locate_blocks",
    signature = (path, max_blocks = MAX_HANDLED_BLOCKS, progress = None)
)]
fn py_locate_blocks(
    py: Python<'_>,
    path: PathBuf,
    max_blocks: usize,
    progress: Option<Py<PyAny>>,
) -> PyResult<Vec<(u64, u64)>> {
    let options = LocateOptions {
        max_blocks,
        ..Default::default()
    };

    let map = py
        .allow_threads(|| {
            locate_blocks(&path, &options, |percent| {
                let Some(callback) = &progress else {
                    return;
                };
                Python::with_gil(|py| {
                    if let Err(err) = callback.call1(py, (percent,)) {
                        log::warn!("Progress callback failed; error={}", err);
                    }
                });
            })
        })
        .map_err(to_py_err)?;

    Ok(map.iter().map(|s| (s.start_bit, s.end_bit)).collect())
}

/// Extracts one located block as a standalone bzip2 stream
#[pyfunction(
    name = "load_block",
    signature = (path, start_bit, end_bit, capacity = None)
)]
fn py_load_block<'py>(
    py: Python<'py>,
    path: PathBuf,
    start_bit: u64,
    end_bit: u64,
    capacity: Option<usize>,
) -> PyResult<Bound<'py, PyBytes>> {
    let span = BlockSpan::new(start_bit, end_bit);
    let mut out = vec![0u8; capacity.unwrap_or_else(|| span.required_capacity())];

    let written = py
        .allow_threads(|| load_block(&path, span, &mut out))
        .map_err(to_py_err)?;

    Ok(PyBytes::new(py, &out[..written]))
}

pub fn init_module(root_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let module = PyModule::new(root_module.py(), "bzip2")?;
    module.add_function(wrap_pyfunction!(py_locate_blocks, &module)?)?;
    module.add_function(wrap_pyfunction!(py_load_block, &module)?)?;
    module.add_class::<PyRecoverErrorKind>()?;
    module.add(
        "RecoverError",
        root_module.py().get_type::<PyRecoverError>(),
    )?;
    module.add("MAX_HANDLED_BLOCKS", MAX_HANDLED_BLOCKS)?;

    root_module.add_submodule(&module)?;
    root_module
        .py()
        .import("sys")?
        .getattr("modules")?
        .set_item("bzrecover._rust.bzip2", module)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let cases = [
            (
                RecoverError::Io(std::io::Error::other("boom")),
                PyRecoverErrorKind::Io,
            ),
            (RecoverError::NoUsableBlocks, PyRecoverErrorKind::NoUsableBlocks),
            (
                RecoverError::CapacityExceeded { limit: 1 },
                PyRecoverErrorKind::CapacityExceeded,
            ),
            (
                RecoverError::TruncatedBlock { reached: 1, end: 2 },
                PyRecoverErrorKind::TruncatedBlock,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(PyRecoverErrorKind::from(&err), kind);
        }
    }
}
