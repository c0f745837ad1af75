//! Navigation between main code and its tests.
//!
//! A [`Navigator`] captures everything it needs from the source buffer up
//! front, so it can run later against a target buffer that is still loading.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::correlate::{correlate, Correlation, MatchMode, TargetScope};
use crate::decl::{DeclId, DeclKind, DeclTree};
use crate::editor::{Buffer, Editor, RowSpan};
use crate::error::{Error, Result};
use crate::lang;
use crate::paths::{self, Counterpart};
use crate::template::{TemplateVars, Vars};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The counterpart exists and is selected.
    Found,
    /// The counterpart does not exist; the cursor sits where it belongs.
    Missing,
    /// The counterpart was generated and is selected.
    Generated,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Found => "found",
            Action::Missing => "missing",
            Action::Generated => "generated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub target: PathBuf,
    pub action: Action,
    /// Qualified counterpart name, e.g. `TestFoo.test_bar`.
    pub name: String,
    #[serde(flatten)]
    pub rows: RowSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToTest { generate: bool },
    ToMain,
}

/// One level of the declaration path under the cursor.
#[derive(Debug, Clone)]
struct SourceDecl {
    kind: DeclKind,
    name: String,
    /// Names declared in the same scope, in source order, this one included.
    siblings: Vec<String>,
}

impl SourceDecl {
    fn sibling_names(&self) -> Vec<&str> {
        self.siblings.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Navigator {
    direction: Direction,
    target: PathBuf,
    path: Vec<SourceDecl>,
    vars: Vars,
    config: Config,
}

impl Navigator {
    /// Index `text` (the contents of `source`) and capture the declaration at `row`.
    pub fn prepare(source: &Path, text: &str, row: usize, generate: bool, config: &Config) -> Result<Self> {
        let counterpart = paths::counterpart(source, &config.layout)?;
        let tree = lang::index_with(text, config.index)?;
        let current = tree
            .find_decl_at(row)
            .ok_or(Error::NoCurrentDeclaration { row })?;

        let path = tree
            .path_to_root(current)
            .into_iter()
            .map(|id| source_decl(&tree, id))
            .collect();

        let direction = match counterpart {
            Counterpart::Test { .. } => Direction::ToTest { generate },
            Counterpart::Main { .. } => {
                if generate {
                    tracing::debug!("main code is never generated; navigating only");
                }
                Direction::ToMain
            }
        };
        let target = counterpart.path().to_path_buf();

        let mut vars = Vars::new();
        vars.insert(TemplateVars::SOURCE_FILENAME, source.display().to_string());
        vars.insert(TemplateVars::TARGET_FILENAME, target.display().to_string());
        vars.insert(TemplateVars::RELMODULE, paths::relmodule(source, &config.layout));

        Ok(Self {
            direction,
            target,
            path,
            vars,
            config: config.clone(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether running this navigation may write to the target.
    pub fn generates(&self) -> bool {
        matches!(self.direction, Direction::ToTest { generate: true })
    }

    /// Qualified name of the source declaration, e.g. `Foo.bar`.
    pub fn source_name(&self) -> String {
        self.path
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Move the selection in `buffer` to the counterpart, generating it when asked.
    pub fn goto<B: Buffer + ?Sized>(&self, buffer: &mut B) -> Result<Outcome> {
        match self.direction {
            Direction::ToTest { generate } => self.goto_test(buffer, generate),
            Direction::ToMain => self.goto_main(buffer),
        }
    }

    fn goto_test<B: Buffer + ?Sized>(&self, buffer: &mut B, generate: bool) -> Result<Outcome> {
        let naming = &self.config.naming;
        let top = &self.path[0];
        let mut vars = self.vars.clone();
        vars.insert(TemplateVars::NAME, top.name.clone());
        vars.insert(TemplateVars::TESTNAME, naming.test_class_name(&top.name));

        if generate && buffer.is_empty() {
            let head = self.config.templates.make_head(&vars)?;
            buffer.insert_rows(0, &head, self.config.margins.top);
        }

        let method = self.path.get(1).filter(|d| d.kind == DeclKind::Function);
        match (top.kind, method) {
            (DeclKind::Class, Some(method)) => self.goto_method(buffer, generate, vars, method),
            _ => self.goto_top_level(buffer, generate, vars),
        }
    }

    fn goto_top_level<B: Buffer + ?Sized>(&self, buffer: &mut B, generate: bool, vars: Vars) -> Result<Outcome> {
        let top = &self.path[0];
        let test_name = vars[TemplateVars::TESTNAME].clone();
        let label = if top.kind == DeclKind::Class { "goto_class" } else { "goto_func" };
        tracing::debug!(name = %top.name, "{}", label);

        let tree = self.index_target(buffer)?;
        match self.correlate_test_class(&tree) {
            Correlation::Found(id) => Ok(self.show(buffer, &tree, id, test_name)),
            Correlation::NotFound { anchor_row } if generate => {
                let templates = &self.config.templates;
                let content = if top.kind == DeclKind::Class {
                    templates.make_class_test(&vars)?
                } else {
                    templates.make_function_test(&vars)?
                };
                let rows = buffer.insert_rows(anchor_row, &content, self.config.margins.top);
                Ok(self.outcome(Action::Generated, test_name, rows))
            }
            Correlation::NotFound { anchor_row } => Ok(self.missing(buffer, anchor_row, test_name)),
        }
    }

    fn goto_method<B: Buffer + ?Sized>(
        &self,
        buffer: &mut B,
        generate: bool,
        vars: Vars,
        method: &SourceDecl,
    ) -> Result<Outcome> {
        let naming = &self.config.naming;
        let class = &self.path[0];
        tracing::debug!(class = %class.name, method = %method.name, "goto_method");
        let class_test = vars[TemplateVars::TESTNAME].clone();

        let mut tree = self.index_target(buffer)?;
        let mut class_match = self.correlate_test_class(&tree);
        if let Correlation::NotFound { anchor_row } = class_match {
            if generate {
                let content = self.config.templates.make_class_test(&vars)?;
                buffer.insert_rows(anchor_row, &content, self.config.margins.top);
                tree = self.index_target(buffer)?;
                class_match = self.correlate_test_class(&tree);
            }
        }
        let class_id = match class_match {
            Correlation::Found(id) => id,
            Correlation::NotFound { anchor_row } => {
                return Ok(self.missing(buffer, anchor_row, class_test));
            }
        };

        let test_name = naming.test_method_name(&method.name);
        let qualified = format!("{}.{}", class_test, test_name);
        let scope = TargetScope::children_of(&tree, class_id);
        let result = correlate(
            &method.name,
            &method.sibling_names(),
            &scope,
            |n| Some(naming.test_method_name(n)),
            self.config.matching.method,
        );
        match result {
            Correlation::Found(id) => Ok(self.show(buffer, &tree, id, qualified)),
            Correlation::NotFound { anchor_row } if generate => {
                let mut vars = vars;
                vars.insert(TemplateVars::NAME, method.name.clone());
                vars.insert(TemplateVars::TESTNAME, test_name);
                vars.insert(TemplateVars::CLASSNAME, class.name.clone());
                let content = self.config.templates.make_method_test(&vars)?;
                let rows = buffer.insert_rows(anchor_row, &content, self.config.margins.method);
                Ok(self.outcome(Action::Generated, qualified, rows))
            }
            Correlation::NotFound { anchor_row } => Ok(self.missing(buffer, anchor_row, qualified)),
        }
    }

    fn goto_main<B: Buffer + ?Sized>(&self, buffer: &mut B) -> Result<Outcome> {
        let naming = &self.config.naming;
        let top = &self.path[0];
        let main_name = naming.main_name(&top.name).unwrap_or_default();
        tracing::debug!(name = %top.name, "goto_main");

        let tree = self.index_target(buffer)?;
        let scope = TargetScope::top_level(&tree);
        let class_id = match correlate(
            &top.name,
            &top.sibling_names(),
            &scope,
            |n| naming.main_name(n),
            self.config.matching.class,
        ) {
            Correlation::Found(id) => id,
            Correlation::NotFound { anchor_row } => return Ok(self.missing(buffer, anchor_row, main_name)),
        };

        let method = self.path.get(1).filter(|d| d.kind == DeclKind::Function);
        if let Some(method) = method {
            if tree.get(class_id).kind == DeclKind::Class {
                let scope = TargetScope::children_of(&tree, class_id);
                let resolve = |n: &str| {
                    naming
                        .main_method_name(n)
                        .map(|stripped| resolve_method_name(&scope, stripped))
                };
                let qualified = format!("{}.{}", main_name, resolve(&method.name).unwrap_or_default());
                return Ok(
                    match correlate(&method.name, &method.sibling_names(), &scope, resolve, MatchMode::Exact) {
                        Correlation::Found(id) => self.show(buffer, &tree, id, qualified),
                        Correlation::NotFound { anchor_row } => self.missing(buffer, anchor_row, qualified),
                    },
                );
            }
        }
        Ok(self.show(buffer, &tree, class_id, main_name))
    }

    fn index_target<B: Buffer + ?Sized>(&self, buffer: &B) -> Result<DeclTree> {
        lang::index_with(buffer.text(), self.config.index)
    }

    fn correlate_test_class(&self, tree: &DeclTree) -> Correlation {
        let naming = &self.config.naming;
        let top = &self.path[0];
        correlate(
            &top.name,
            &top.sibling_names(),
            &TargetScope::top_level(tree),
            |n| Some(naming.test_class_name(n)),
            self.config.matching.class,
        )
    }

    fn show<B: Buffer + ?Sized>(&self, buffer: &mut B, tree: &DeclTree, id: DeclId, name: String) -> Outcome {
        let d = tree.get(id);
        let rows = RowSpan::new(d.first_row, d.last_row);
        buffer.select_rows(rows);
        self.outcome(Action::Found, name, rows)
    }

    fn missing<B: Buffer + ?Sized>(&self, buffer: &mut B, anchor_row: usize, name: String) -> Outcome {
        let rows = RowSpan::row(anchor_row);
        buffer.select_rows(rows);
        self.outcome(Action::Missing, name, rows)
    }

    fn outcome(&self, action: Action, name: String, rows: RowSpan) -> Outcome {
        Outcome {
            target: self.target.clone(),
            action,
            name,
            rows,
        }
    }
}

fn source_decl(tree: &DeclTree, id: DeclId) -> SourceDecl {
    let d = tree.get(id);
    let scope = d.parent().unwrap_or(DeclTree::ROOT);
    SourceDecl {
        kind: d.kind,
        name: d.name.clone(),
        siblings: tree
            .names(tree.get(scope).children())
            .into_iter()
            .map(str::to_owned)
            .collect(),
    }
}

/// `bar_edge_case` names the method `bar_edge_case`, else `bar_edge`, else `bar`.
fn resolve_method_name(scope: &TargetScope<'_>, stripped: String) -> String {
    let mut candidate = stripped.as_str();
    loop {
        if !scope.matches(candidate, MatchMode::Exact).is_empty() {
            return candidate.to_owned();
        }
        match candidate.rfind('_') {
            Some(i) if i > 0 => candidate = &candidate[..i],
            _ => return stripped,
        }
    }
}

/// Run `nav` now, or once its target buffer has loaded.
pub fn navigate(editor: &mut Editor<Navigator>, nav: Navigator) -> Result<Option<Outcome>> {
    let target = nav.target().to_path_buf();
    let buffer = editor.open_file(&target);
    if buffer.is_loading() {
        editor.defer(&target, nav);
        return Ok(None);
    }
    nav.goto(buffer).map(Some)
}

/// Finish loading `path` and run the navigation waiting for it, if any.
pub fn on_load(editor: &mut Editor<Navigator>, path: &Path) -> Result<Option<Outcome>> {
    let Some(nav) = editor.finish_loading(path)? else {
        return Ok(None);
    };
    let buffer = editor.open_file(path);
    nav.goto(buffer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextBuffer;

    const SHAPES: &str = "class Foo:\n    def bar(self):\n        pass\n";

    fn prepare(source: &str, text: &str, row: usize, generate: bool) -> Result<Navigator> {
        Navigator::prepare(Path::new(source), text, row, generate, &Config::default())
    }

    fn run(nav: &Navigator, target_text: &str) -> (Outcome, TextBuffer) {
        let mut buffer = TextBuffer::new(nav.target(), target_text);
        let outcome = nav.goto(&mut buffer).unwrap();
        (outcome, buffer)
    }

    // ── main -> test ──

    #[test]
    fn generates_head_class_and_method_into_empty_file() {
        let nav = prepare("pkg/shapes.py", SHAPES, 1, true).unwrap();
        assert_eq!(nav.target(), Path::new("pkg/tests/test_shapes.py"));
        assert_eq!(nav.source_name(), "Foo.bar");

        let (outcome, buffer) = run(&nav, "");
        assert_eq!(outcome.action, Action::Generated);
        assert_eq!(outcome.name, "TestFoo.test_bar");
        assert_eq!(outcome.rows, RowSpan::new(13, 15));
        assert_eq!(buffer.selection(), outcome.rows);

        let text = buffer.text();
        assert!(text.starts_with("import unittest\n\n\nclass TestFoo(unittest.TestCase):\n"));
        assert!(text.contains("        from ..shapes import Foo\n"));
        assert!(text.ends_with(
            "        return self._class()\n\n    def test_bar(self):\n        obj = self._make()\n        obj.bar()\n"
        ));
    }

    #[test]
    fn generated_code_is_found_on_the_next_run() {
        let nav = prepare("pkg/shapes.py", SHAPES, 2, true).unwrap();
        let (_, buffer) = run(&nav, "");
        let generated = buffer.text().to_owned();

        let (outcome, buffer) = run(&nav, &generated);
        assert_eq!(outcome.action, Action::Found);
        assert_eq!(outcome.rows, RowSpan::new(13, 15));
        assert_eq!(buffer.text(), generated);
    }

    #[test]
    fn goto_without_generate_leaves_target_alone() {
        let nav = prepare("pkg/shapes.py", SHAPES, 1, false).unwrap();
        let target = "import unittest\n\n\nclass TestOther(unittest.TestCase):\n    pass\n";
        let (outcome, buffer) = run(&nav, target);
        assert_eq!(outcome.action, Action::Missing);
        assert_eq!(outcome.name, "TestFoo");
        assert_eq!(outcome.rows, RowSpan::row(5));
        assert_eq!(buffer.text(), target);
        assert!(!buffer.is_modified());
    }

    #[test]
    fn existing_method_test_found_by_prefix_group() {
        let nav = prepare("pkg/shapes.py", SHAPES, 1, true).unwrap();
        let target = concat!(
            "import unittest\n",
            "\n",
            "\n",
            "class TestFoo(unittest.TestCase):\n",
            "    def test_bar_with_zero(self):\n",
            "        pass\n",
        );
        let (outcome, buffer) = run(&nav, target);
        assert_eq!(outcome.action, Action::Found);
        assert_eq!(outcome.rows, RowSpan::new(4, 5));
        assert!(!buffer.is_modified());
    }

    #[test]
    fn exact_method_matching_skips_suffixed_tests() {
        let mut config = Config::default();
        config.matching.method = MatchMode::Exact;
        let nav = Navigator::prepare(Path::new("pkg/shapes.py"), SHAPES, 1, false, &config).unwrap();
        let target = concat!(
            "import unittest\n",
            "\n",
            "\n",
            "class TestFoo(unittest.TestCase):\n",
            "    def test_bar_with_zero(self):\n",
            "        pass\n",
        );
        let (outcome, _) = run(&nav, target);
        assert_eq!(outcome.action, Action::Missing);
        assert_eq!(outcome.name, "TestFoo.test_bar");
    }

    #[test]
    fn constructor_test_has_no_call_line() {
        let source = "class Foo:\n    def __init__(self):\n        pass\n";
        let nav = prepare("pkg/shapes.py", source, 1, true).unwrap();
        let target = "import unittest\n\n\nclass TestFoo(unittest.TestCase):\n    pass\n";
        let (outcome, buffer) = run(&nav, target);
        assert_eq!(outcome.name, "TestFoo.test_ctor");
        assert!(buffer
            .text()
            .ends_with("    pass\n\n    def test_ctor(self):\n        obj = self._make()\n"));
    }

    #[test]
    fn function_test_inserted_between_neighbours() {
        let source = "def alpha():\n    pass\n\n\ndef beta():\n    pass\n\n\ndef gamma():\n    pass\n";
        let nav = prepare("pkg/util.py", source, 4, true).unwrap();
        let target = concat!(
            "import unittest\n",
            "\n",
            "\n",
            "class Test_alpha(unittest.TestCase):\n",
            "    pass\n",
            "\n",
            "\n",
            "class Test_gamma(unittest.TestCase):\n",
            "    pass\n",
        );
        let (outcome, buffer) = run(&nav, target);
        assert_eq!(outcome.action, Action::Generated);
        assert_eq!(outcome.name, "Test_beta");
        assert_eq!(outcome.rows.first_row, 7);

        let tree = lang::index(buffer.text());
        assert_eq!(tree.names(tree.top_level()), vec!["Test_alpha", "Test_beta", "Test_gamma"]);
        assert!(buffer.text().contains("    pass\n\n\nclass Test_beta(unittest.TestCase):\n"));
        assert!(buffer.text().contains("        return beta(*args, **kw)\n\n\nclass Test_gamma"));
    }

    #[test]
    fn package_init_uses_empty_relmodule() {
        let nav = prepare("/nonexistent/pkg/__init__.py", "def setup():\n    pass\n", 0, true).unwrap();
        assert_eq!(nav.target(), Path::new("/nonexistent/pkg/tests/test_pkg.py"));
        let (_, buffer) = run(&nav, "");
        assert!(buffer.text().contains("        from .. import setup\n"));
    }

    // ── test -> main ──

    #[test]
    fn test_method_leads_to_main_method() {
        let source = concat!(
            "class TestFoo(unittest.TestCase):\n",
            "    def test_bar_edge_case(self):\n",
            "        pass\n",
        );
        let nav = prepare("pkg/tests/test_shapes.py", source, 2, false).unwrap();
        assert_eq!(nav.target(), Path::new("pkg/shapes.py"));

        let main = "class Foo:\n    def __init__(self):\n        pass\n\n    def bar(self):\n        pass\n";
        let (outcome, _) = run(&nav, main);
        assert_eq!(outcome.action, Action::Found);
        assert_eq!(outcome.name, "Foo.bar");
        assert_eq!(outcome.rows, RowSpan::new(4, 5));
    }

    #[test]
    fn ctor_test_leads_to_init() {
        let source = "class TestFoo:\n    def test_ctor(self):\n        pass\n";
        let nav = prepare("pkg/tests/test_shapes.py", source, 1, false).unwrap();
        let main = "class Foo:\n    def __init__(self):\n        pass\n";
        let (outcome, _) = run(&nav, main);
        assert_eq!(outcome.name, "Foo.__init__");
        assert_eq!(outcome.rows, RowSpan::new(1, 2));
    }

    #[test]
    fn function_test_leads_to_function() {
        let source = "class Test_helper:\n    def test_it(self):\n        pass\n";
        let nav = prepare("pkg/tests/test_util.py", source, 0, false).unwrap();
        let (outcome, _) = run(&nav, "import os\n\n\ndef helper():\n    return os.sep\n");
        assert_eq!(outcome.action, Action::Found);
        assert_eq!(outcome.name, "helper");
        assert_eq!(outcome.rows, RowSpan::new(3, 4));
    }

    #[test]
    fn main_code_is_never_generated() {
        let source = "class TestMissing:\n    pass\n";
        let nav = prepare("pkg/tests/test_shapes.py", source, 0, true).unwrap();
        assert!(!nav.generates());
        let (outcome, buffer) = run(&nav, "x = 1\n");
        assert_eq!(outcome.action, Action::Missing);
        assert_eq!(buffer.text(), "x = 1\n");
    }

    // ── failures ──

    #[test]
    fn no_declaration_under_cursor() {
        let err = prepare("pkg/shapes.py", "import os\n\nclass A:\n    pass\n", 0, false).unwrap_err();
        assert!(matches!(err, Error::NoCurrentDeclaration { row: 0 }));
        assert!(err.is_informational());
    }

    #[test]
    fn source_syntax_error_aborts() {
        let err = prepare("pkg/shapes.py", "def f(:\n    pass\n", 0, false).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn target_syntax_error_aborts_without_changes() {
        let nav = prepare("pkg/shapes.py", SHAPES, 0, true).unwrap();
        let mut buffer = TextBuffer::new(nav.target(), "class TestFoo(:\n    pass\n");
        assert!(matches!(nav.goto(&mut buffer), Err(Error::Parse { .. })));
        assert!(!buffer.is_modified());
    }

    #[test]
    fn helper_in_tests_dir_is_rejected() {
        let err = prepare("pkg/tests/conftest.py", "def f():\n    pass\n", 0, false).unwrap_err();
        assert!(matches!(err, Error::NotATestModule(_)));
    }

    // ── deferral ──

    #[test]
    fn navigation_waits_for_target_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let tests_dir = tmp.path().join("pkg").join("tests");
        std::fs::create_dir_all(&tests_dir).unwrap();
        let target = tests_dir.join("test_shapes.py");
        std::fs::write(&target, "import unittest\n\n\nclass TestFoo(unittest.TestCase):\n    pass\n").unwrap();

        let source = tmp.path().join("pkg").join("shapes.py");
        let nav = Navigator::prepare(&source, SHAPES, 0, false, &Config::default()).unwrap();

        let mut editor = Editor::new();
        assert_eq!(navigate(&mut editor, nav).unwrap(), None);
        assert!(editor.is_pending(&target));

        let outcome = on_load(&mut editor, &target).unwrap().unwrap();
        assert_eq!(outcome.action, Action::Found);
        assert_eq!(outcome.rows, RowSpan::new(3, 4));
        assert_eq!(on_load(&mut editor, &target).unwrap(), None);
    }
}
