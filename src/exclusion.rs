use std::collections::HashSet;

const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".git", ".hg", ".svn", "__pycache__", ".venv", "venv",
    ".tox", ".nox", ".eggs", ".mypy_cache", ".pytest_cache",
    ".ruff_cache", ".ipynb_checkpoints", "site-packages",
    "node_modules", "build", "dist", ".idea", ".vscode",
];

/// Directory suffixes excluded along with the default names.
const DEFAULT_SUFFIXES: &[&str] = &[".egg-info", ".dist-info"];

pub struct ExclusionFilter {
    exclusions: HashSet<String>,
    suffixes: &'static [&'static str],
}

impl ExclusionFilter {
    pub fn new(additional: &[String], disable_defaults: bool) -> Self {
        let mut exclusions = HashSet::new();
        if !disable_defaults {
            exclusions.extend(DEFAULT_EXCLUSIONS.iter().map(|n| n.to_ascii_lowercase()));
        }
        exclusions.extend(additional.iter().map(|n| n.to_ascii_lowercase()));
        let suffixes = if disable_defaults { &[][..] } else { DEFAULT_SUFFIXES };
        Self { exclusions, suffixes }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        let lowered = name.to_ascii_lowercase();
        self.exclusions.contains(&lowered) || self.suffixes.iter().any(|s| lowered.ends_with(s))
    }
}
