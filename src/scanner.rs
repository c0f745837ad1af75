use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::Layout;
use crate::exclusion::ExclusionFilter;
use crate::lang;

/// Main-code modules under `root`: Python files outside tests directories
/// that are not test modules themselves. Sorted case-insensitively.
pub fn find_main_modules(
    root: &Path,
    layout: &Layout,
    filter: &ExclusionFilter,
    cancelled: &AtomicBool,
) -> Vec<PathBuf> {
    let mut results = Vec::new();
    find_recursive(root, layout, filter, cancelled, &mut results);
    results.sort_by_key(|p| p.to_string_lossy().to_ascii_lowercase());
    results
}

fn is_main_module(name: &str, path: &Path, layout: &Layout) -> bool {
    lang::is_python_file(path) && !name.starts_with(layout.file_prefix.as_str())
}

fn find_recursive(
    dir: &Path,
    layout: &Layout,
    filter: &ExclusionFilter,
    cancelled: &AtomicBool,
    results: &mut Vec<PathBuf>,
) {
    if cancelled.load(Ordering::Relaxed) {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };

    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let ft = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if ft.is_file() {
            let path = entry.path();
            if is_main_module(&name_str, &path, layout) {
                results.push(path);
            }
        } else if ft.is_dir() && name_str != layout.tests_dir && !filter.is_excluded(&name_str) {
            subdirs.push(entry.path());
        }
    }

    let sub_results: Vec<Vec<PathBuf>> = subdirs
        .par_iter()
        .map(|subdir| {
            let mut sub = Vec::new();
            find_recursive(subdir, layout, filter, cancelled, &mut sub);
            sub
        })
        .collect();

    for sub in sub_results {
        results.extend(sub);
    }
}
