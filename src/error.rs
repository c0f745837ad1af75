use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source text failed the strict structural checks. Line and column are 1-based.
    #[error("SyntaxError: {message} (line {line}, column {column})")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("No declaration at row {row}")]
    NoCurrentDeclaration { row: usize },

    #[error("Unknown match mode: {0}")]
    UnknownMatchMode(String),

    #[error("{} is not a Python module (.py files only)", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("{} is not a test module", .0.display())]
    NotATestModule(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("Template '{name}' references unknown variable '{variable}'")]
    Template { name: String, variable: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Error::Parse { line, column, message: message.into() }
    }

    /// Conditions the host reports as a status message rather than a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, Error::NoCurrentDeclaration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_carries_location() {
        let e = Error::parse(3, 7, "unmatched ')'");
        assert_eq!(e.to_string(), "SyntaxError: unmatched ')' (line 3, column 7)");
    }

    #[test]
    fn only_missing_declaration_is_informational() {
        assert!(Error::NoCurrentDeclaration { row: 4 }.is_informational());
        assert!(!Error::UnknownMatchMode("fuzzy".into()).is_informational());
        assert!(!Error::parse(1, 1, "x").is_informational());
    }
}
