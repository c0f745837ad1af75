//! Test stub templates with `{{variable}}` placeholders.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

pub struct TemplateVars;

impl TemplateVars {
    pub const SOURCE_FILENAME: &'static str = "source_filename";
    pub const TARGET_FILENAME: &'static str = "target_filename";
    pub const RELMODULE: &'static str = "relmodule";
    pub const NAME: &'static str = "name";
    pub const TESTNAME: &'static str = "testname";
    pub const CLASSNAME: &'static str = "classname";
    pub const OPNAME: &'static str = "opname";
}

pub type Vars = BTreeMap<&'static str, String>;

const HEAD: &str = "import unittest\n";

const FUNCTION: &str = "\
class {{testname}}(unittest.TestCase):

    def _call(self, *args, **kw):
        from ..{{relmodule}} import {{name}}
        return {{name}}(*args, **kw)
";

const CLASS: &str = "\
class {{testname}}(unittest.TestCase):

    @property
    def _class(self):
        from ..{{relmodule}} import {{name}}
        return {{name}}

    def _make(self):
        return self._class()
";

const METHOD: &str = concat!(
    "    def {{testname}}(self):\n",
    "        obj = self._make()\n",
);

const METHOD_CALL: &str = "        obj{{opname}}()\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub head: String,
    pub function: String,
    pub class: String,
    pub method: String,
    /// Appended to `method` for methods other than the constructor.
    pub method_call: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            head: HEAD.into(),
            function: FUNCTION.into(),
            class: CLASS.into(),
            method: METHOD.into(),
            method_call: METHOD_CALL.into(),
        }
    }
}

impl Templates {
    pub fn make_head(&self, vars: &Vars) -> Result<String> {
        render("head", &self.head, vars)
    }

    pub fn make_function_test(&self, vars: &Vars) -> Result<String> {
        render("function", &self.function, vars)
    }

    pub fn make_class_test(&self, vars: &Vars) -> Result<String> {
        render("class", &self.class, vars)
    }

    /// Method stub; a call line follows unless the method is the constructor.
    pub fn make_method_test(&self, vars: &Vars) -> Result<String> {
        let mut out = render("method", &self.method, vars)?;
        let name = vars.get(TemplateVars::NAME).map(String::as_str).unwrap_or_default();
        let opname = match name {
            "__init__" => return Ok(out),
            "__call__" => String::new(),
            other => format!(".{}", other),
        };
        let mut vars = vars.clone();
        vars.insert(TemplateVars::OPNAME, opname);
        out.push_str(&render("method_call", &self.method_call, &vars)?);
        Ok(out)
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Substitute every placeholder; a placeholder without a value is an error.
pub fn render(name: &str, template: &str, vars: &Vars) -> Result<String> {
    let mut missing: Option<String> = None;
    let out = placeholder_re().replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        match vars.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| key.to_owned());
                String::new()
            }
        }
    });
    match missing {
        Some(variable) => Err(Error::Template {
            name: name.to_owned(),
            variable,
        }),
        None => Ok(out.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> Vars {
        pairs.iter().map(|&(k, v)| (k, v.to_owned())).collect()
    }

    #[test]
    fn render_substitutes_with_and_without_spaces() {
        let v = vars(&[("name", "Foo")]);
        assert_eq!(render("t", "a {{name}} b {{ name }}", &v).unwrap(), "a Foo b Foo");
    }

    #[test]
    fn render_rejects_unknown_variable() {
        let err = render("class", "{{nope}}", &Vars::new()).unwrap_err();
        assert!(matches!(err, Error::Template { ref variable, .. } if variable == "nope"));
    }

    #[test]
    fn render_leaves_single_braces() {
        let v = vars(&[("x", "1")]);
        assert_eq!(render("t", "d = {'k': {{x}}}", &v).unwrap(), "d = {'k': 1}");
    }

    #[test]
    fn class_test_imports_from_relmodule() {
        let t = Templates::default();
        let v = vars(&[("testname", "TestFoo"), ("relmodule", "shapes"), ("name", "Foo")]);
        let out = t.make_class_test(&v).unwrap();
        assert!(out.starts_with("class TestFoo(unittest.TestCase):\n"));
        assert!(out.contains("        from ..shapes import Foo\n"));
    }

    #[test]
    fn method_test_is_indented_into_the_class() {
        let t = Templates::default();
        let mut v = vars(&[("testname", "test_area"), ("name", "area"), ("classname", "Foo")]);
        assert_eq!(
            t.make_method_test(&v).unwrap(),
            "    def test_area(self):\n        obj = self._make()\n        obj.area()\n"
        );

        v.insert(TemplateVars::TESTNAME, "test_call".into());
        v.insert(TemplateVars::NAME, "__call__".into());
        assert_eq!(
            t.make_method_test(&v).unwrap(),
            "    def test_call(self):\n        obj = self._make()\n        obj()\n"
        );

        v.insert(TemplateVars::TESTNAME, "test_ctor".into());
        v.insert(TemplateVars::NAME, "__init__".into());
        assert_eq!(
            t.make_method_test(&v).unwrap(),
            "    def test_ctor(self):\n        obj = self._make()\n"
        );
    }

    #[test]
    fn every_stub_indexes_where_it_belongs() {
        let t = Templates::default();
        let v = vars(&[
            ("testname", "TestFoo"),
            ("relmodule", "shapes"),
            ("name", "Foo"),
        ]);
        let mut text = t.make_class_test(&v).unwrap();
        let m = vars(&[("testname", "test_bar"), ("name", "bar"), ("classname", "Foo")]);
        text.push('\n');
        text.push_str(&t.make_method_test(&m).unwrap());

        let tree = crate::lang::index(&text);
        assert_eq!(tree.top_level().len(), 1);
        let class = tree.get(tree.top_level()[0]);
        assert_eq!(tree.names(class.children()), vec!["_class", "_make", "test_bar"]);
    }
}
