//! The main-file <-> tests-file path convention.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Layout;
use crate::error::{Error, Result};
use crate::lang;

/// Which side of the convention a file is on, and where its counterpart lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counterpart {
    /// `source` is main code; its tests live in `test_path`.
    Test { test_path: PathBuf },
    /// `source` is a test module for `main_path`.
    Main { main_path: PathBuf },
}

impl Counterpart {
    pub fn path(&self) -> &Path {
        match self {
            Counterpart::Test { test_path } => test_path,
            Counterpart::Main { main_path } => main_path,
        }
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Resolve the counterpart of `source`, consulting `exists` for the package-initializer rule.
pub fn counterpart_with<F>(source: &Path, layout: &Layout, exists: F) -> Result<Counterpart>
where
    F: Fn(&Path) -> bool,
{
    if !lang::is_python_file(source) {
        return Err(Error::UnsupportedFile(source.to_path_buf()));
    }
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let base = file_name(source);

    if file_name(dir) == layout.tests_dir {
        let Some(main_base) = base.strip_prefix(layout.file_prefix.as_str()) else {
            return Err(Error::NotATestModule(source.to_path_buf()));
        };
        let package_dir = dir.parent().unwrap_or_else(|| Path::new(""));
        let mut main_path = package_dir.join(main_base);
        let package_module = format!("{}.{}", file_name(package_dir), lang::PYTHON_EXTENSION);
        if main_base == package_module && !exists(&main_path) {
            main_path = package_dir.join(&layout.package_marker);
        }
        return Ok(Counterpart::Main { main_path });
    }

    let mut main_base = base.to_owned();
    if base == layout.package_marker {
        let package_module = format!("{}.{}", file_name(dir), lang::PYTHON_EXTENSION);
        if !exists(&dir.join(&package_module)) {
            main_base = package_module;
        }
    }
    let test_path = dir
        .join(&layout.tests_dir)
        .join(format!("{}{}", layout.file_prefix, main_base));
    Ok(Counterpart::Test { test_path })
}

pub fn counterpart(source: &Path, layout: &Layout) -> Result<Counterpart> {
    counterpart_with(source, layout, |p| p.exists())
}

/// Module name used in relative imports: the file stem, or empty for a package initializer.
pub fn relmodule(source: &Path, layout: &Layout) -> String {
    if file_name(source) == layout.package_marker {
        return String::new();
    }
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Create `dir` and an empty package marker inside it. Safe to call repeatedly.
pub fn ensure_package_dir(dir: &Path, layout: &Layout) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let marker = dir.join(&layout.package_marker);
    if !marker.exists() {
        fs::write(&marker, "").map_err(|e| Error::io(&marker, e))?;
        tracing::info!(path = %marker.display(), "created package marker");
    }
    Ok(())
}

pub fn normalized_relative(root: &Path, full: &Path) -> String {
    let rel = full.strip_prefix(root).unwrap_or(full).to_string_lossy();
    if cfg!(windows) {
        rel.replace('\\', "/")
    } else {
        rel.into_owned()
    }
}
