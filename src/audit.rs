//! Report main-code declarations that have no correlated test.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::correlate::{correlate, Correlation, TargetScope};
use crate::decl::{DeclKind, DeclTree};
use crate::error::Result;
use crate::file_reader;
use crate::lang;
use crate::naming::Naming;
use crate::paths;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub path: String,
    pub test_path: String,
    pub test_exists: bool,
    /// `Foo`, `Foo.bar` or `func`, in source order.
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Audit every file in parallel. Files with nothing to report are left out.
pub fn audit_files(file_paths: &[PathBuf], root: &Path, cancelled: &AtomicBool) -> Vec<AuditEntry> {
    let mut results: Vec<AuditEntry> = file_paths
        .par_iter()
        .filter_map(|path| {
            if cancelled.load(Ordering::Relaxed) {
                return None;
            }
            process_file(path, root)
        })
        .collect();

    results.sort_by(|a, b| a.path.to_ascii_lowercase().cmp(&b.path.to_ascii_lowercase()));
    results
}

fn process_file(path: &Path, root: &Path) -> Option<AuditEntry> {
    let relative = paths::normalized_relative(root, path);
    let mut entry = AuditEntry {
        path: relative,
        test_path: String::new(),
        test_exists: false,
        missing: Vec::new(),
        error: None,
    };

    match audit_file(path, root, &mut entry) {
        Ok(true) if !entry.missing.is_empty() => Some(entry),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "audit failed");
            entry.error = Some(e.to_string());
            Some(entry)
        }
    }
}

/// Fill in `entry`; `Ok(false)` when the file is binary and was skipped.
fn audit_file(path: &Path, root: &Path, entry: &mut AuditEntry) -> Result<bool> {
    let dir = path.parent().unwrap_or(root);
    let config = Config::discover(dir)?;
    let counterpart = paths::counterpart(path, &config.layout)?;
    let test_path = counterpart.path();
    entry.test_path = paths::normalized_relative(root, test_path);

    let Some(main_text) = file_reader::read_file(path)? else {
        return Ok(false);
    };
    let main_tree = lang::index_with(&main_text, config.index)?;
    if main_tree.is_empty() {
        return Ok(true);
    }

    entry.test_exists = test_path.is_file();
    let test_text = if entry.test_exists {
        file_reader::read_file(test_path)?.unwrap_or_default()
    } else {
        String::new()
    };
    let test_tree = lang::index_with(&test_text, config.index)?;

    entry.missing = missing_tests(&main_tree, &test_tree, &config);
    Ok(true)
}

fn is_private(name: &str, naming: &Naming) -> bool {
    name.starts_with('_') && !naming.method_aliases.contains_key(name)
}

/// Names of public top-level declarations and public methods without a test.
pub fn missing_tests(main: &DeclTree, tests: &DeclTree, config: &Config) -> Vec<String> {
    let naming = &config.naming;
    let mut missing = Vec::new();
    let scope = TargetScope::top_level(tests);
    let top_names = main.names(main.top_level());

    for &id in main.top_level() {
        let decl = main.get(id);
        if decl.name.starts_with('_') {
            continue;
        }
        let test_class = match correlate(
            &decl.name,
            &top_names,
            &scope,
            |n| Some(naming.test_class_name(n)),
            config.matching.class,
        ) {
            Correlation::Found(test_class) => test_class,
            Correlation::NotFound { .. } => {
                missing.push(decl.name.clone());
                continue;
            }
        };
        if decl.kind != DeclKind::Class {
            continue;
        }

        let methods = TargetScope::children_of(tests, test_class);
        let method_names = main.names(decl.children());
        for &child in decl.children() {
            let method = main.get(child);
            if method.kind != DeclKind::Function || is_private(&method.name, naming) {
                continue;
            }
            let found = correlate(
                &method.name,
                &method_names,
                &methods,
                |n| Some(naming.test_method_name(n)),
                config.matching.method,
            )
            .found();
            if found.is_none() {
                missing.push(format!("{}.{}", decl.name, method.name));
            }
        }
    }
    missing
}
