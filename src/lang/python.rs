use std::sync::OnceLock;

use regex::Regex;

use super::common::{self, LineClass, DEFAULT_TAB_WIDTH};
use crate::decl::{DeclId, DeclKind, DeclTree};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub tab_width: usize,
    /// Reject text with unbalanced brackets, unterminated strings or headers
    /// missing their colon instead of indexing it heuristically.
    pub strict: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            strict: false,
        }
    }
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(class|(?:async[ \t]+)?def)[ \t]+([^\W\d]\w*)").expect("header pattern is valid")
    })
}

/// Build the declaration tree of `text`. Never fails; malformed input is indexed heuristically.
pub fn index(text: &str) -> DeclTree {
    build(text, IndexOptions::default()).0
}

/// Like [`index`], but in strict mode the first structural problem is returned as [`Error::Parse`].
pub fn index_with(text: &str, options: IndexOptions) -> Result<DeclTree> {
    let (tree, problem) = build(text, options);
    match problem {
        Some(p) if options.strict => Err(Error::parse(p.line, p.column, p.message)),
        _ => Ok(tree),
    }
}

fn build(text: &str, options: IndexOptions) -> (DeclTree, Option<common::Problem>) {
    let scan = common::scan(text, options.tab_width);
    let line_count = scan.lines.len();
    let mut tree = DeclTree::new(line_count);
    let mut open: Vec<DeclId> = Vec::new();
    let mut decorated_from: Option<usize> = None;
    let mut problems = scan.problems;

    for (row, line) in scan.lines.iter().enumerate() {
        if line.class != LineClass::Code {
            continue;
        }
        let trimmed = line.text.trim_start();

        if trimmed.starts_with('@') {
            if decorated_from.is_none() {
                close_open(&mut tree, &mut open, line.indent, row);
                decorated_from = Some(row);
            }
            continue;
        }

        let Some(caps) = header_re().captures(trimmed) else {
            decorated_from = None;
            close_open(&mut tree, &mut open, line.indent, row);
            continue;
        };

        let first_row = decorated_from.take().unwrap_or(row);
        close_open(&mut tree, &mut open, line.indent, first_row);

        if !line.block_colon {
            problems.push(common::Problem {
                line: row + 1,
                column: line.text.chars().count() + 1,
                message: "expected ':'".into(),
            });
        }

        let kind = if &caps[1] == "class" {
            DeclKind::Class
        } else {
            DeclKind::Function
        };
        let parent = open.last().copied().unwrap_or(DeclTree::ROOT);
        let id = tree.push(parent, kind, caps[2].to_owned(), first_row, line.indent);
        open.push(id);
    }

    let last_row = line_count.saturating_sub(1);
    for id in open {
        tree.close(id, last_row);
    }

    problems.sort_by_key(|p| (p.line, p.column));
    (tree, problems.into_iter().next())
}

/// Close every open declaration indented at or beyond `indent`; they end on the row before `row`.
fn close_open(tree: &mut DeclTree, open: &mut Vec<DeclId>, indent: usize, row: usize) {
    while let Some(&top) = open.last() {
        if tree.get(top).indent < indent {
            break;
        }
        tree.close(top, row.saturating_sub(1));
        open.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::Decl;

    fn summary(tree: &DeclTree, ids: &[DeclId]) -> Vec<(String, usize, usize)> {
        ids.iter()
            .map(|&id| {
                let d: &Decl = tree.get(id);
                (d.name.clone(), d.first_row, d.last_row)
            })
            .collect()
    }

    fn check_invariants(tree: &DeclTree, id: DeclId) {
        let node = tree.get(id);
        let children = node.children();
        for pair in children.windows(2) {
            assert!(tree.get(pair[0]).last_row < tree.get(pair[1]).first_row);
        }
        for &child in children {
            let c = tree.get(child);
            assert!(c.first_row <= c.last_row);
            assert!(node.first_row <= c.first_row && c.last_row <= node.last_row);
            check_invariants(tree, child);
        }
    }

    #[test]
    fn class_with_method() {
        let tree = index("class Foo:\n    def bar(self):\n        pass\n");
        assert_eq!(summary(&tree, tree.top_level()), vec![("Foo".into(), 0, 2)]);
        let foo = tree.top_level()[0];
        assert_eq!(tree.get(foo).kind, DeclKind::Class);
        assert_eq!(summary(&tree, tree.get(foo).children()), vec![("bar".into(), 1, 2)]);

        let bar = tree.find_decl_at(1).unwrap();
        assert_eq!(tree.get(bar).name, "bar");
        assert_eq!(tree.get(bar).kind, DeclKind::Function);
        assert_eq!(tree.names(&tree.path_to_root(bar)), vec!["Foo", "bar"]);
    }

    #[test]
    fn odd_layouts() {
        let content = concat!(
            "if 1:\n",          // 0
            " def foo():\n",    // 1
            "  pass\n",         // 2
            "\n",               // 3
            "\n",               // 4
            " class bar():\n",  // 5
            "  def baz():\n",   // 6
            "   def zed():\n",  // 7
            "    return [\n",   // 8
            "     1]\n",        // 9
            "\n",               // 10
            " # hi!\n",         // 11
            "  stop = True\n",  // 12
            "class Y: pass\n",  // 13
            "class Z:\n",       // 14
            " '''stuff\n",      // 15
            "... more '''\n",   // 16
            "\n",               // 17
        );
        let tree = index_with(content, IndexOptions { strict: true, ..Default::default() }).unwrap();
        assert_eq!(
            summary(&tree, tree.top_level()),
            vec![
                ("foo".into(), 1, 4),
                ("bar".into(), 5, 12),
                ("Y".into(), 13, 13),
                ("Z".into(), 14, 17),
            ]
        );
        let bar = tree.top_level()[1];
        let baz = tree.get(bar).children()[0];
        assert_eq!(summary(&tree, &[baz]), vec![("baz".into(), 6, 11)]);
        assert_eq!(summary(&tree, tree.get(baz).children()), vec![("zed".into(), 7, 11)]);
        check_invariants(&tree, DeclTree::ROOT);
    }

    #[test]
    fn trailing_blanks_and_comments_belong_to_previous() {
        let tree = index("def a():\n    pass\n\n# trailing\n\nx = 1\ndef b():\n    pass\n");
        assert_eq!(
            summary(&tree, tree.top_level()),
            vec![("a".into(), 0, 4), ("b".into(), 6, 7)]
        );
        assert!(tree.find_decl_at(5).is_none());
    }

    #[test]
    fn decorators_start_the_header() {
        let tree = index("@dec\n@other(1)\ndef f():\n    pass\n\n@property\ndef g():\n    pass\n");
        assert_eq!(
            summary(&tree, tree.top_level()),
            vec![("f".into(), 0, 4), ("g".into(), 5, 7)]
        );
    }

    #[test]
    fn decorated_method_inside_class() {
        let tree = index("class A:\n    def x(self):\n        pass\n    @staticmethod\n    def y():\n        pass\n");
        let a = tree.top_level()[0];
        assert_eq!(
            summary(&tree, tree.get(a).children()),
            vec![("x".into(), 1, 2), ("y".into(), 3, 5)]
        );
    }

    #[test]
    fn async_def_is_function() {
        let tree = index("async def fetch():\n    pass\n");
        let id = tree.top_level()[0];
        assert_eq!(tree.get(id).name, "fetch");
        assert_eq!(tree.get(id).kind, DeclKind::Function);
    }

    #[test]
    fn header_words_inside_strings_are_ignored() {
        let tree = index("s = '''\ndef not_real():\n'''\nclass Real:\n    pass\n");
        assert_eq!(summary(&tree, tree.top_level()), vec![("Real".into(), 3, 4)]);
    }

    #[test]
    fn identifiers_that_start_with_keywords() {
        let tree = index("classify = 1\ndefault = 2\ndef define():\n    pass\n");
        assert_eq!(summary(&tree, tree.top_level()), vec![("define".into(), 2, 3)]);
    }

    #[test]
    fn tabs_and_spaces_compare_by_tab_stop() {
        let tree = index("class A:\n\tdef f(self):\n\t\tpass\n        def g(self):\n\t\tpass\n");
        let a = tree.top_level()[0];
        assert_eq!(tree.names(tree.get(a).children()), vec!["f", "g"]);
    }

    #[test]
    fn empty_text() {
        let tree = index("");
        assert!(tree.is_empty());
        assert_eq!(tree.end_row(), 0);
        assert!(tree.find_decl_at(0).is_none());
    }

    #[test]
    fn end_row_is_past_the_last_line() {
        assert_eq!(index("a = 1\nb = 2\n").end_row(), 2);
        assert_eq!(index("a = 1\nb = 2").end_row(), 2);
        assert_eq!(index("a = 1\n\n").end_row(), 2);
    }

    #[test]
    fn lenient_index_tolerates_broken_text() {
        let tree = index("def f():\n    pass\nclass B\n    x = 1)\n");
        assert_eq!(tree.names(tree.top_level()), vec!["f", "B"]);
        check_invariants(&tree, DeclTree::ROOT);
    }

    #[test]
    fn strict_rejects_missing_colon() {
        let err = index_with("class B\n    pass\n", IndexOptions { strict: true, ..Default::default() })
            .unwrap_err();
        match err {
            Error::Parse { line, message, .. } => {
                assert_eq!(line, 1);
                assert_eq!(message, "expected ':'");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn strict_reports_earliest_problem() {
        let err = index_with("x = (\ny = 'abc\n", IndexOptions { strict: true, ..Default::default() })
            .unwrap_err();
        match err {
            Error::Parse { line, column, .. } => assert_eq!((line, column), (1, 5)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lenient_mode_ignores_problems() {
        let tree = index_with("x = (\n", IndexOptions::default()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn multi_line_header() {
        let tree = index_with(
            "def f(\n    a,\n    b,\n):\n    return a\n",
            IndexOptions { strict: true, ..Default::default() },
        )
        .unwrap();
        assert_eq!(summary(&tree, tree.top_level()), vec![("f".into(), 0, 4)]);
    }

    // ── generated sources ──

    use proptest::prelude::*;

    const FRAGMENTS: &[&str] = &[
        "class Alpha:",
        "class Beta(Base):",
        "def run(self):",
        "async def fetch(url):",
        "def split(",
        "    a, b):",
        "@property",
        "@cache(maxsize=2)",
        "x = 1",
        "pass",
        "return (1,",
        "    2)",
        "s = '''doc",
        "def inside(): '''",
        "y = 1 + \\",
        "t = \"a # b\"",
        "# class Hidden:",
        "",
        "\tdef tabbed():",
        "d = {'k': [1, 2]}",
    ];

    fn python_like() -> impl Strategy<Value = String> {
        (
            prop::collection::vec((0..4usize, 0..FRAGMENTS.len()), 0..40),
            any::<bool>(),
        )
            .prop_map(|(lines, trailing_newline)| {
                let mut text = lines
                    .iter()
                    .map(|&(depth, i)| format!("{}{}", "    ".repeat(depth), FRAGMENTS[i]))
                    .collect::<Vec<_>>()
                    .join("\n");
                if trailing_newline && !text.is_empty() {
                    text.push('\n');
                }
                text
            })
    }

    proptest! {
        #[test]
        fn generated_sources_keep_tree_invariants(text in python_like()) {
            let tree = index(&text);
            check_invariants(&tree, DeclTree::ROOT);
            prop_assert_eq!(tree.end_row(), text.lines().count());

            let strict = index_with(&text, IndexOptions { strict: true, ..Default::default() });
            if let Ok(strict) = strict {
                prop_assert_eq!(summary(&strict, strict.top_level()), summary(&tree, tree.top_level()));
            }
        }

        #[test]
        fn row_lookup_agrees_with_paths(text in python_like()) {
            let tree = index(&text);
            for row in 0..text.lines().count() {
                match tree.find_decl_at(row) {
                    Some(id) => {
                        let decl = tree.get(id);
                        prop_assert!(decl.contains_row(row));
                        prop_assert!(decl.children().iter().all(|&c| !tree.get(c).contains_row(row)));

                        let path = tree.path_to_root(id);
                        prop_assert_eq!(path.last().copied(), Some(id));
                        prop_assert_eq!(tree.get(path[0]).parent(), Some(DeclTree::ROOT));
                        for pair in path.windows(2) {
                            prop_assert_eq!(tree.get(pair[1]).parent(), Some(pair[0]));
                        }
                        prop_assert!(path.iter().all(|&p| tree.get(p).contains_row(row)));
                    }
                    None => {
                        prop_assert!(tree.top_level().iter().all(|&t| !tree.get(t).contains_row(row)));
                    }
                }
            }
        }
    }
}
