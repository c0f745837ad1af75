//! Match a source declaration against the declarations of a target scope, or
//! work out where a missing counterpart belongs.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::str::FromStr;

use crate::decl::{DeclId, DeclTree};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The transformed name must equal a target name.
    Exact,
    /// Targets named `name` or `name_<anything>`, in name order.
    PrefixGroup,
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchMode::Exact),
            "prefix_under" | "prefix-group" => Ok(MatchMode::PrefixGroup),
            other => Err(Error::UnknownMatchMode(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    Found(DeclId),
    /// No counterpart; new content belongs at the start of `anchor_row`.
    NotFound { anchor_row: usize },
}

impl Correlation {
    pub fn found(self) -> Option<DeclId> {
        match self {
            Correlation::Found(id) => Some(id),
            Correlation::NotFound { .. } => None,
        }
    }

    /// Rows to select in the target: the match's range, or the anchor row.
    pub fn rows(self, tree: &DeclTree) -> (usize, usize) {
        match self {
            Correlation::Found(id) => {
                let d = tree.get(id);
                (d.first_row, d.last_row)
            }
            Correlation::NotFound { anchor_row } => (anchor_row, anchor_row),
        }
    }
}

/// Target declarations of one scope, keyed by name. Built once per scope.
pub struct TargetScope<'t> {
    tree: &'t DeclTree,
    by_name: BTreeMap<&'t str, DeclId>,
    parent: Option<DeclId>,
}

impl<'t> TargetScope<'t> {
    /// The module-level declarations of `tree`.
    pub fn top_level(tree: &'t DeclTree) -> Self {
        Self::build(tree, tree.top_level(), None)
    }

    /// The declarations nested directly in `parent`.
    pub fn children_of(tree: &'t DeclTree, parent: DeclId) -> Self {
        Self::build(tree, tree.get(parent).children(), Some(parent))
    }

    fn build(tree: &'t DeclTree, ids: &[DeclId], parent: Option<DeclId>) -> Self {
        let mut by_name = BTreeMap::new();
        for &id in ids {
            // Duplicate names resolve to the first in source order.
            by_name.entry(tree.get(id).name.as_str()).or_insert(id);
        }
        Self { tree, by_name, parent }
    }

    pub fn tree(&self) -> &'t DeclTree {
        self.tree
    }

    /// Target declarations matching `name` under `mode`, in name order.
    pub fn matches(&self, name: &str, mode: MatchMode) -> Vec<DeclId> {
        match mode {
            MatchMode::Exact => self.by_name.get(name).copied().into_iter().collect(),
            MatchMode::PrefixGroup => {
                let prefix = format!("{}_", name);
                self.by_name
                    .range::<str, _>((Bound::Included(name), Bound::Unbounded))
                    .take_while(|(key, _)| key.starts_with(name))
                    .filter(|(key, _)| **key == name || key.starts_with(&prefix))
                    .map(|(_, &id)| id)
                    .collect()
            }
        }
    }
}

/// Find the counterpart of `source_name` in `target`, or the row where it should be created.
///
/// `siblings` are the names of the source scope in source order, `source_name`
/// among them. `transform` maps a source name to a target name; `None` means the
/// name has no counterpart under the rule and only affects anchoring.
pub fn correlate<F>(
    source_name: &str,
    siblings: &[&str],
    target: &TargetScope<'_>,
    transform: F,
    mode: MatchMode,
) -> Correlation
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(target_name) = transform(source_name) {
        if let Some(&id) = target.matches(&target_name, mode).first() {
            return Correlation::Found(id);
        }
    }

    let tree = target.tree;
    let mut insert_after: Option<usize> = None;
    let mut insert_before: Option<usize> = None;
    let mut past_current = false;

    for &sibling in siblings {
        if sibling == source_name {
            past_current = true;
            continue;
        }
        let Some(name) = transform(sibling) else {
            continue;
        };
        for id in target.matches(&name, mode) {
            let d = tree.get(id);
            if past_current {
                let row = d.first_row.saturating_sub(1);
                insert_before = Some(insert_before.map_or(row, |r| r.min(row)));
            } else {
                let row = d.last_row + 1;
                insert_after = Some(insert_after.map_or(row, |r| r.max(row)));
            }
        }
    }

    let anchor_row = insert_after
        .or(insert_before)
        .or_else(|| target.parent.map(|p| tree.get(p).last_row + 1))
        .unwrap_or_else(|| tree.end_row());

    Correlation::NotFound { anchor_row }
}
