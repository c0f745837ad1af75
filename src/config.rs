//! Settings layered from `.gototest.toml` files.
//!
//! Built-in defaults come first, then every config file from the filesystem
//! root down to the target's directory, so the nearest file has the last word.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::correlate::MatchMode;
use crate::error::{Error, Result};
use crate::lang::IndexOptions;
use crate::naming::Naming;
use crate::template::Templates;

pub const CONFIG_FILE_NAME: &str = ".gototest.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub tests_dir: String,
    pub file_prefix: String,
    pub package_marker: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            tests_dir: "tests".into(),
            file_prefix: "test_".into(),
            package_marker: "__init__.py".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    /// Blank lines around the file head, test classes and test functions.
    pub top: usize,
    /// Blank lines around test methods.
    pub method: usize,
}

impl Default for Margins {
    fn default() -> Self {
        Self { top: 2, method: 1 }
    }
}

/// How source declarations find their counterparts in the test module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matching {
    /// Classes and module functions against test classes.
    pub class: MatchMode,
    /// Methods against the test methods of their test class.
    pub method: MatchMode,
}

impl Default for Matching {
    fn default() -> Self {
        Self {
            class: MatchMode::Exact,
            method: MatchMode::PrefixGroup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub naming: Naming,
    pub layout: Layout,
    pub margins: Margins,
    pub matching: Matching,
    pub index: IndexOptions,
    pub templates: Templates,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            naming: Naming::default(),
            layout: Layout::default(),
            margins: Margins::default(),
            matching: Matching::default(),
            index: IndexOptions {
                strict: true,
                ..IndexOptions::default()
            },
            templates: Templates::default(),
        }
    }
}

// ── file format: every field optional so files can be layered ──

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    naming: NamingFile,
    layout: LayoutFile,
    insert: InsertFile,
    matching: MatchingFile,
    index: IndexFile,
    templates: TemplatesFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NamingFile {
    class_prefix: Option<String>,
    function_prefix: Option<String>,
    method_prefix: Option<String>,
    method_aliases: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LayoutFile {
    tests_dir: Option<String>,
    file_prefix: Option<String>,
    package_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct InsertFile {
    top_margin: Option<usize>,
    method_margin: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MatchingFile {
    class: Option<String>,
    method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct IndexFile {
    tab_width: Option<usize>,
    strict: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TemplatesFile {
    head: Option<String>,
    function: Option<String>,
    class: Option<String>,
    method: Option<String>,
    method_call: Option<String>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn match_mode(value: Option<String>) -> std::result::Result<Option<MatchMode>, String> {
    value
        .map(|v| v.parse::<MatchMode>().map_err(|e| e.to_string()))
        .transpose()
}

impl Config {
    /// Defaults overlaid with every config file between the root and `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut config = Config::default();
        for path in lineage(dir) {
            config.apply_file(&path)?;
        }
        Ok(config)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        self.apply_str(&text).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), "applied config");
        Ok(())
    }

    fn apply_str(&mut self, text: &str) -> std::result::Result<(), String> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| e.to_string())?;

        let n = file.naming;
        set(&mut self.naming.class_prefix, n.class_prefix);
        set(&mut self.naming.function_prefix, n.function_prefix);
        set(&mut self.naming.method_prefix, n.method_prefix);
        if let Some(aliases) = n.method_aliases {
            self.naming.method_aliases.extend(aliases);
        }

        let l = file.layout;
        set(&mut self.layout.tests_dir, l.tests_dir);
        set(&mut self.layout.file_prefix, l.file_prefix);
        set(&mut self.layout.package_marker, l.package_marker);

        set(&mut self.margins.top, file.insert.top_margin);
        set(&mut self.margins.method, file.insert.method_margin);

        set(&mut self.matching.class, match_mode(file.matching.class)?);
        set(&mut self.matching.method, match_mode(file.matching.method)?);

        set(&mut self.index.tab_width, file.index.tab_width);
        set(&mut self.index.strict, file.index.strict);

        let t = file.templates;
        set(&mut self.templates.head, t.head);
        set(&mut self.templates.function, t.function);
        set(&mut self.templates.class, t.class);
        set(&mut self.templates.method, t.method);
        set(&mut self.templates.method_call, t.method_call);

        if self.layout.tests_dir.is_empty() || self.layout.file_prefix.is_empty() {
            return Err("layout.tests_dir and layout.file_prefix must not be empty".into());
        }
        if self.index.tab_width == 0 {
            return Err("index.tab_width must be at least 1".into());
        }
        Ok(())
    }
}

/// Existing config files from the outermost ancestor of `dir` down to `dir` itself.
fn lineage(dir: &Path) -> Vec<PathBuf> {
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let mut found: Vec<PathBuf> = dir
        .ancestors()
        .map(|d| d.join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
        .collect();
    found.reverse();
    found
}
