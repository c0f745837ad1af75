use std::io::{self, BufWriter, Write};

use crate::audit::AuditEntry;
use crate::models::{DeclEntry, OutputEnvelope};
use crate::navigator::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

pub fn write_output(envelope: &OutputEnvelope, format: OutputFormat) {
    let stdout = io::stdout();
    let mut w = BufWriter::with_capacity(64 * 1024, stdout.lock());
    write_envelope(&mut w, envelope, format).ok();
    w.flush().ok();
}

pub fn write_envelope(w: &mut impl Write, envelope: &OutputEnvelope, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Yaml => write_envelope_yaml(w, envelope),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *w, envelope)?;
            writeln!(w)
        }
    }
}

// ── YAML output ──

fn write_envelope_yaml(w: &mut impl Write, envelope: &OutputEnvelope) -> io::Result<()> {
    if let Some(ref meta) = envelope.meta {
        write!(w, "{}", meta)?;
    }
    if let Some(ref error) = envelope.error {
        write_scalar(w, "error", error, 0)?;
    }
    if let Some(ref status) = envelope.status {
        write_scalar(w, "status", status, 0)?;
    }
    if let Some(ref outcome) = envelope.navigation {
        write_navigation(w, outcome)?;
    }
    if let Some(ref written) = envelope.written {
        write_list(w, "written", written, 0)?;
    }
    if let Some(ref contents) = envelope.contents {
        write_block_scalar(w, "contents", contents, 0)?;
    }
    if let Some(ref decls) = envelope.decls {
        write!(w, "decls:\n")?;
        write_decls(w, decls, 0)?;
    }
    if let Some(ref audit) = envelope.audit {
        write_audit(w, audit)?;
    }
    Ok(())
}

fn write_navigation(w: &mut impl Write, outcome: &Outcome) -> io::Result<()> {
    write!(w, "navigation:\n")?;
    write_scalar(w, "target", &outcome.target.to_string_lossy(), 2)?;
    write_scalar(w, "action", outcome.action.as_str(), 2)?;
    write_scalar(w, "name", &outcome.name, 2)?;
    write!(w, "  firstRow: {}\n", outcome.rows.first_row)?;
    write!(w, "  lastRow: {}\n", outcome.rows.last_row)?;
    Ok(())
}

fn write_decls(w: &mut impl Write, decls: &[DeclEntry], indent: usize) -> io::Result<()> {
    for decl in decls {
        write_indent(w, indent)?;
        write!(w, "- kind: {}\n", decl.kind.as_str())?;
        write_scalar(w, "name", &decl.name, indent + 2)?;
        write_indent(w, indent + 2)?;
        write!(w, "firstRow: {}\n", decl.first_row)?;
        write_indent(w, indent + 2)?;
        write!(w, "lastRow: {}\n", decl.last_row)?;
        if !decl.children.is_empty() {
            write_indent(w, indent + 2)?;
            write!(w, "children:\n")?;
            write_decls(w, &decl.children, indent + 2)?;
        }
    }
    Ok(())
}

fn write_audit(w: &mut impl Write, entries: &[AuditEntry]) -> io::Result<()> {
    write!(w, "audit:\n")?;
    for entry in entries {
        write!(w, "- path: ")?;
        write_inline_string(w, &entry.path)?;
        write!(w, "\n")?;
        write_scalar(w, "testPath", &entry.test_path, 2)?;
        write!(w, "  testExists: {}\n", entry.test_exists)?;
        if !entry.missing.is_empty() {
            write_list(w, "missing", &entry.missing, 2)?;
        }
        if let Some(ref error) = entry.error {
            write_scalar(w, "error", error, 2)?;
        }
    }
    Ok(())
}

fn write_list(w: &mut impl Write, key: &str, items: &[String], indent: usize) -> io::Result<()> {
    write_indent(w, indent)?;
    if items.is_empty() {
        return write!(w, "{}: []\n", key);
    }
    write!(w, "{}:\n", key)?;
    for item in items {
        write_indent(w, indent)?;
        write!(w, "- ")?;
        write_inline_string(w, item)?;
        write!(w, "\n")?;
    }
    Ok(())
}

fn write_block_scalar(w: &mut impl Write, key: &str, content: &str, indent: usize) -> io::Result<()> {
    write_indent(w, indent)?;
    let indicator = if needs_indent_indicator(content) { "|2+" } else { "|+" };
    write!(w, "{}: {}\n", key, indicator)?;
    for line in content.lines() {
        if line.is_empty() {
            write!(w, "\n")?;
        } else {
            write_indent(w, indent + 2)?;
            write!(w, "{}\n", line)?;
        }
    }
    Ok(())
}

/// Block scalars infer their indentation from the first non-blank line, so
/// an explicit indicator is required when that line is indented or when a
/// leading blank line carries spaces.
fn needs_indent_indicator(content: &str) -> bool {
    for line in content.lines() {
        if !line.trim().is_empty() {
            return line.starts_with(' ');
        }
        if !line.is_empty() {
            return true;
        }
    }
    false
}

fn write_scalar(w: &mut impl Write, key: &str, value: &str, indent: usize) -> io::Result<()> {
    write_indent(w, indent)?;
    write!(w, "{}: ", key)?;
    write_inline_string(w, value)?;
    write!(w, "\n")?;
    Ok(())
}

fn write_inline_string(w: &mut impl Write, value: &str) -> io::Result<()> {
    if value.is_empty() {
        return write!(w, "''");
    }

    if needs_quoting(value) {
        write!(w, "\"")?;
        for c in value.chars() {
            match c {
                '"' => write!(w, "\\\"")?,
                '\\' => write!(w, "\\\\")?,
                '\n' => write!(w, "\\n")?,
                '\r' => write!(w, "\\r")?,
                '\t' => write!(w, "\\t")?,
                _ => write!(w, "{}", c)?,
            }
        }
        write!(w, "\"")?;
    } else {
        write!(w, "{}", value)?;
    }
    Ok(())
}

fn needs_quoting(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }

    let first = value.as_bytes()[0];
    if matches!(first, b'-' | b'[' | b']' | b'{' | b'}' | b'\'' | b'"' |
        b'!' | b'&' | b'*' | b'|' | b'>' | b'%' | b'@' | b'`' | b',' | b'?' | b'#' | b' ') {
        return true;
    }

    match value {
        "true" | "false" | "null" | "True" | "False" | "Null" |
        "TRUE" | "FALSE" | "NULL" | "yes" | "no" | "Yes" | "No" |
        "YES" | "NO" | "on" | "off" | "On" | "Off" | "ON" | "OFF" | "~" => return true,
        _ => {}
    }

    if looks_numeric(value) {
        return true;
    }

    value.ends_with(' ') || value.chars().any(|c| matches!(c, ':' | '#' | '\n' | '\r' | '\t'))
}

fn looks_numeric(value: &str) -> bool {
    let bytes = value.as_bytes();
    let start = match bytes.first() {
        Some(b'-') | Some(b'+') => 1,
        Some(_) => 0,
        None => return false,
    };
    let rest = &bytes[start..];
    if rest.is_empty() {
        return false;
    }
    let mut has_dot = false;
    for &b in rest {
        match b {
            b'0'..=b'9' => {}
            b'.' if !has_dot => has_dot = true,
            _ => return false,
        }
    }
    true
}

fn write_indent(w: &mut impl Write, n: usize) -> io::Result<()> {
    const SPACES: &[u8; 32] = b"                                ";
    if n <= SPACES.len() {
        w.write_all(&SPACES[..n])
    } else {
        for _ in 0..n {
            w.write_all(b" ")?;
        }
        Ok(())
    }
}
