//! Name transformations between main code and test code.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    /// Prefix for test classes of capitalized names: `Foo` -> `TestFoo`.
    pub class_prefix: String,
    /// Prefix for test classes of other names: `foo` -> `Test_foo`.
    pub function_prefix: String,
    pub method_prefix: String,
    /// Method names replaced before prefixing, e.g. `__init__` -> `ctor`.
    pub method_aliases: BTreeMap<String, String>,
}

impl Default for Naming {
    fn default() -> Self {
        let method_aliases = [("__init__", "ctor"), ("__call__", "call")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self {
            class_prefix: "Test".into(),
            function_prefix: "Test_".into(),
            method_prefix: "test_".into(),
            method_aliases,
        }
    }
}

impl Naming {
    /// Test class name for a main class or function.
    pub fn test_class_name(&self, name: &str) -> String {
        if name.chars().next().is_some_and(char::is_uppercase) {
            format!("{}{}", self.class_prefix, name)
        } else {
            format!("{}{}", self.function_prefix, name)
        }
    }

    pub fn test_method_name(&self, name: &str) -> String {
        let base = self.method_aliases.get(name).map_or(name, String::as_str);
        format!("{}{}", self.method_prefix, base)
    }

    /// Main class or function name for a test class; `None` without a recognized prefix.
    pub fn main_name(&self, test_name: &str) -> Option<String> {
        let mut prefixes = [self.function_prefix.as_str(), self.class_prefix.as_str()];
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find_map(|p| test_name.strip_prefix(p))
            .filter(|rest| !rest.is_empty())
            .map(str::to_owned)
    }

    /// Main method name for a test method, undoing aliases; `None` without the prefix.
    pub fn main_method_name(&self, test_name: &str) -> Option<String> {
        let rest = test_name.strip_prefix(self.method_prefix.as_str())?;
        if rest.is_empty() {
            return None;
        }
        let original = self
            .method_aliases
            .iter()
            .find(|(_, alias)| alias.as_str() == rest)
            .map_or(rest, |(name, _)| name.as_str());
        Some(original.to_owned())
    }
}
