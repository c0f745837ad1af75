//! Jump between Python modules and their unit tests.
//!
//! The core is two steps: [`lang::index`] builds a tree of the classes and
//! functions in a source text, and [`correlate::correlate`] finds the
//! counterpart of a declaration in another tree, or the row where it belongs.
//! [`navigator`] drives both against [`editor`] buffers.

pub mod audit;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod decl;
pub mod editor;
pub mod error;
pub mod exclusion;
pub mod file_reader;
pub mod lang;
pub mod models;
pub mod naming;
pub mod navigator;
pub mod paths;
pub mod pending;
pub mod scanner;
pub mod template;
pub mod yaml_output;

pub use config::Config;
pub use correlate::{correlate, Correlation, MatchMode, TargetScope};
pub use decl::{Decl, DeclId, DeclKind, DeclTree};
pub use editor::{Buffer, Editor, RowSpan, TextBuffer};
pub use error::{Error, Result};
pub use navigator::{Action, Navigator, Outcome};
