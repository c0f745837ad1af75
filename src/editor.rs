//! A minimal editor host: text buffers with a cursor and selection, a loading
//! state, and continuations that run once a buffer has loaded.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::file_reader;
use crate::pending::{resolve_key, PendingQueue};

/// Inclusive range of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpan {
    pub first_row: usize,
    pub last_row: usize,
}

impl RowSpan {
    pub fn new(first_row: usize, last_row: usize) -> Self {
        Self { first_row, last_row }
    }

    pub fn row(row: usize) -> Self {
        Self::new(row, row)
    }
}

/// What navigation needs from an editor buffer.
pub trait Buffer {
    fn path(&self) -> &Path;
    fn text(&self) -> &str;
    fn cursor_row(&self) -> usize;
    fn is_loading(&self) -> bool;

    fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Insert `content` at the start of `row` with at least `margin` blank
    /// lines around it, select it, and return the rows it now occupies.
    fn insert_rows(&mut self, row: usize, content: &str, margin: usize) -> RowSpan;

    fn select_rows(&mut self, span: RowSpan);

    fn selection(&self) -> RowSpan;
}

#[derive(Debug, Clone)]
pub struct TextBuffer {
    path: PathBuf,
    text: String,
    selection: RowSpan,
    loading: bool,
    modified: bool,
}

impl TextBuffer {
    /// A loaded buffer holding `text`.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            selection: RowSpan::default(),
            loading: false,
            modified: false,
        }
    }

    /// A buffer whose contents have not been read yet.
    pub fn loading(path: impl Into<PathBuf>) -> Self {
        Self {
            loading: true,
            ..Self::new(path, String::new())
        }
    }

    /// Read the file behind the buffer. A file that does not exist yet loads empty.
    pub fn load(&mut self) -> Result<()> {
        let text = file_reader::read_file_or_empty(&self.path)?.ok_or_else(|| Error::Read {
            path: self.path.clone(),
            message: "binary file".into(),
        })?;
        self.text = text;
        self.loading = false;
        self.modified = false;
        self.selection = RowSpan::default();
        Ok(())
    }

    pub fn set_cursor_row(&mut self, row: usize) {
        self.selection = RowSpan::row(row);
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn save(&mut self) -> Result<()> {
        fs::write(&self.path, &self.text).map_err(|e| Error::io(&self.path, e))?;
        self.modified = false;
        tracing::debug!(path = %self.path.display(), "saved buffer");
        Ok(())
    }
}

impl Buffer for TextBuffer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn cursor_row(&self) -> usize {
        self.selection.first_row
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    fn insert_rows(&mut self, row: usize, content: &str, margin: usize) -> RowSpan {
        let span = insert_with_margin(&mut self.text, row, content, margin);
        self.modified = true;
        self.selection = span;
        tracing::debug!(path = %self.path.display(), first = span.first_row, last = span.last_row, "inserted rows");
        span
    }

    fn select_rows(&mut self, span: RowSpan) {
        self.selection = span;
    }

    fn selection(&self) -> RowSpan {
        self.selection
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Byte offset where `row` starts, or the end of `text` past the last row.
fn row_offset(text: &str, row: usize) -> usize {
    if row == 0 {
        return 0;
    }
    text.match_indices('\n')
        .nth(row - 1)
        .map_or(text.len(), |(i, _)| i + 1)
}

/// `"\r\n"` when the first line of `text` ends that way, else `"\n"`.
fn line_ending(text: &str) -> &'static str {
    match text.find('\n') {
        Some(i) if text[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Insert `content` into `text` at the start of `row`.
///
/// Blank rows directly above `row` are skipped so the new text follows the
/// preceding code. Blank lines are then added so at least `margin` of them
/// separate the insertion from text before it (when not at the top) and from
/// code after it. Inserted lines use the line ending `text` already has.
/// Returns the rows `content` occupies afterwards.
pub fn insert_with_margin(text: &mut String, row: usize, content: &str, margin: usize) -> RowSpan {
    let eol = line_ending(text);
    if !text.is_empty() && !text.ends_with('\n') {
        text.push_str(eol);
    }
    let lines: Vec<&str> = text.lines().collect();
    let mut row = row.min(lines.len());
    while row > 0 && is_blank(lines[row - 1]) {
        row -= 1;
    }

    let rest = &lines[row..];
    let before = if row > 0 { margin } else { 0 };
    let after = if rest.iter().any(|l| !is_blank(l)) {
        margin - rest.iter().take(margin).take_while(|l| is_blank(l)).count()
    } else {
        0
    };

    let mut body: String = content.lines().map(|l| format!("{}{}", l, eol)).collect();
    if body.is_empty() {
        body.push_str(eol);
    }
    let body_rows = content.lines().count().max(1);

    let point = row_offset(text, row);
    let insertion = format!("{}{}{}", eol.repeat(before), body, eol.repeat(after));
    text.insert_str(point, &insertion);

    let first_row = row + before;
    RowSpan::new(first_row, first_row + body_rows - 1)
}

/// Open buffers keyed by resolved path, plus work waiting for them to load.
pub struct Editor<T> {
    buffers: BTreeMap<PathBuf, TextBuffer>,
    pending: PendingQueue<T>,
}

impl<T> Default for Editor<T> {
    fn default() -> Self {
        Self {
            buffers: BTreeMap::new(),
            pending: PendingQueue::new(),
        }
    }
}

impl<T> Editor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already loaded buffer, e.g. one whose text came from stdin.
    pub fn add_buffer(&mut self, buffer: TextBuffer) -> &mut TextBuffer {
        match self.buffers.entry(resolve_key(buffer.path())) {
            Entry::Occupied(mut slot) => {
                slot.insert(buffer);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(buffer),
        }
    }

    /// The buffer for `path`; a newly opened one starts out loading.
    pub fn open_file(&mut self, path: &Path) -> &mut TextBuffer {
        self.buffers
            .entry(resolve_key(path))
            .or_insert_with(|| TextBuffer::loading(path))
    }

    pub fn buffer(&self, path: &Path) -> Option<&TextBuffer> {
        self.buffers.get(&resolve_key(path))
    }

    pub fn buffer_mut(&mut self, path: &Path) -> Option<&mut TextBuffer> {
        self.buffers.get_mut(&resolve_key(path))
    }

    /// Run `work` once `path` has finished loading.
    pub fn defer(&self, path: &Path, work: T) {
        if self.pending.defer(path, work).is_some() {
            tracing::debug!(path = %path.display(), "replaced pending work");
        }
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.is_pending(path)
    }

    /// Load `path` from disk and hand back the work waiting for it, at most once.
    pub fn finish_loading(&mut self, path: &Path) -> Result<Option<T>> {
        let buffer = self.open_file(path);
        if buffer.is_loading() {
            buffer.load()?;
            tracing::debug!(path = %path.display(), "loaded buffer");
        }
        Ok(self.pending.take(path))
    }

    pub fn modified(&self) -> impl Iterator<Item = &TextBuffer> {
        self.buffers.values().filter(|b| b.is_modified())
    }

    /// Write every modified buffer, returning the paths written.
    pub fn save_all(&mut self) -> Result<Vec<PathBuf>> {
        let mut saved = Vec::new();
        for buffer in self.buffers.values_mut().filter(|b| b.is_modified()) {
            buffer.save()?;
            saved.push(buffer.path().to_path_buf());
        }
        Ok(saved)
    }
}
