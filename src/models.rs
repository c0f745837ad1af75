use std::fmt;

use serde::Serialize;

use crate::audit::AuditEntry;
use crate::decl::{DeclId, DeclKind, DeclTree};
use crate::navigator::Outcome;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    pub elapsed_ms: u128,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timeout: bool,
    pub files_scanned: usize,
    pub files_matched: usize,
}

/// A declaration and its nested declarations, for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclEntry {
    pub kind: DeclKind,
    pub name: String,
    pub first_row: usize,
    pub last_row: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DeclEntry>,
}

impl DeclEntry {
    pub fn from_tree(tree: &DeclTree) -> Vec<DeclEntry> {
        tree.top_level().iter().map(|&id| Self::from_node(tree, id)).collect()
    }

    fn from_node(tree: &DeclTree, id: DeclId) -> DeclEntry {
        let d = tree.get(id);
        DeclEntry {
            kind: d.kind,
            name: d.name.clone(),
            first_row: d.first_row,
            last_row: d.last_row,
            children: d.children().iter().map(|&c| Self::from_node(tree, c)).collect(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why nothing happened, when nothing did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<Vec<String>>,
    /// Target text after generation, for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decls: Option<Vec<DeclEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<Vec<AuditEntry>>,
}

impl OutputEnvelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for MetaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "meta:")?;
        if self.elapsed_ms != 0 {
            writeln!(f, "  elapsedMs: {}", self.elapsed_ms)?;
        }
        if self.timeout {
            writeln!(f, "  timeout: true")?;
        }
        if self.files_scanned != 0 {
            writeln!(f, "  filesScanned: {}", self.files_scanned)?;
        }
        if self.files_matched != 0 {
            writeln!(f, "  filesMatched: {}", self.files_matched)?;
        }
        Ok(())
    }
}
