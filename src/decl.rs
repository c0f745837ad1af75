//! Declaration tree: an arena of class/function nodes with inclusive row ranges.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Module,
    Class,
    Function,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Module => "module",
            DeclKind::Class => "class",
            DeclKind::Function => "function",
        }
    }
}

/// Index of a node inside its [`DeclTree`]. Only meaningful for the tree that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(usize);

#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub name: String,
    pub first_row: usize,
    /// Inclusive. Trailing blank and comment rows are part of the range.
    pub last_row: usize,
    pub indent: usize,
    parent: Option<DeclId>,
    children: Vec<DeclId>,
}

impl Decl {
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row && row <= self.last_row
    }

    pub fn parent(&self) -> Option<DeclId> {
        self.parent
    }

    pub fn children(&self) -> &[DeclId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct DeclTree {
    nodes: Vec<Decl>,
    end_row: usize,
}

impl DeclTree {
    pub const ROOT: DeclId = DeclId(0);

    /// An empty tree whose root spans `line_count` lines.
    pub(crate) fn new(line_count: usize) -> Self {
        let root = Decl {
            kind: DeclKind::Module,
            name: String::new(),
            first_row: 0,
            last_row: line_count.saturating_sub(1),
            indent: 0,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            end_row: line_count,
        }
    }

    pub(crate) fn push(
        &mut self,
        parent: DeclId,
        kind: DeclKind,
        name: String,
        first_row: usize,
        indent: usize,
    ) -> DeclId {
        let id = DeclId(self.nodes.len());
        self.nodes.push(Decl {
            kind,
            name,
            first_row,
            last_row: first_row,
            indent,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn close(&mut self, id: DeclId, last_row: usize) {
        let node = &mut self.nodes[id.0];
        node.last_row = last_row.max(node.first_row);
    }

    pub fn get(&self, id: DeclId) -> &Decl {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> &Decl {
        &self.nodes[0]
    }

    pub fn top_level(&self) -> &[DeclId] {
        self.root().children()
    }

    /// Row just past the last line; where text appended to the file begins.
    pub fn end_row(&self) -> usize {
        self.end_row
    }

    /// Number of declarations, excluding the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// All non-root declarations in source order.
    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.nodes.iter().enumerate().skip(1).map(|(i, d)| (DeclId(i), d))
    }

    /// Innermost declaration whose range contains `row`. Never the root.
    pub fn find_decl_at(&self, row: usize) -> Option<DeclId> {
        let mut found = None;
        let mut scope = self.top_level();
        while let Some(&id) = scope.iter().find(|&&id| self.get(id).contains_row(row)) {
            found = Some(id);
            scope = self.get(id).children();
        }
        found
    }

    /// The node and its ancestors, outermost first, without the root.
    pub fn path_to_root(&self, id: DeclId) -> Vec<DeclId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur);
            if node.kind == DeclKind::Module {
                break;
            }
            path.push(cur);
            current = node.parent;
        }
        path.reverse();
        path
    }

    pub fn names(&self, ids: &[DeclId]) -> Vec<&str> {
        ids.iter().map(|&id| self.get(id).name.as_str()).collect()
    }
}
