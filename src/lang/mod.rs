pub mod common;
mod python;

use std::path::Path;

pub use python::{index, index_with, IndexOptions};

pub const PYTHON_EXTENSION: &str = "py";

pub fn is_python_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PYTHON_EXTENSION))
}
