use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gototest::cli::{self, Cli, Command};
use gototest::models::{DeclEntry, MetaInfo, OutputEnvelope};
use gototest::{
    audit, exclusion, file_reader, lang, navigator, paths, scanner, yaml_output, Buffer, Config, Editor, Error,
    Navigator, Result, TextBuffer,
};

const LOG_ENV: &str = "GOTOTEST_LOG";

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start = Instant::now();
    let (mut envelope, code) = match cli.command {
        Command::Goto { location } => finish(execute_navigation(&location, false, false)),
        Command::Generate { location, dry_run } => finish(execute_navigation(&location, true, dry_run)),
        Command::Index { file, stdin } => finish(execute_index(&file, stdin)),
        Command::Audit {
            root,
            excludes,
            no_defaults,
            timeout,
        } => execute_audit(&root, &excludes, no_defaults, timeout, start),
    };

    if envelope.meta.is_none() && envelope.error.is_none() {
        envelope.meta = Some(MetaInfo {
            elapsed_ms: start.elapsed().as_millis(),
            ..MetaInfo::default()
        });
    }
    yaml_output::write_output(&envelope, cli.format);
    code
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn finish(result: Result<OutputEnvelope>) -> (OutputEnvelope, i32) {
    match result {
        Ok(envelope) => (envelope, 0),
        Err(e) if e.is_informational() => (
            OutputEnvelope {
                status: Some(e.to_string()),
                ..OutputEnvelope::default()
            },
            0,
        ),
        Err(e) => (OutputEnvelope::error(e.to_string()), 1),
    }
}

/// Text of `file`, from stdin when the editor holds unsaved changes.
fn read_source(file: &Path, stdin: bool) -> Result<String> {
    if stdin {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| Error::io("<stdin>", e))?;
        return Ok(text);
    }
    file_reader::read_file(file)?.ok_or_else(|| Error::Read {
        path: file.to_path_buf(),
        message: "binary file".into(),
    })
}

fn config_for(file: &Path) -> Result<Config> {
    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Config::discover(dir)
}

fn execute_navigation(location: &cli::Location, generate: bool, dry_run: bool) -> Result<OutputEnvelope> {
    let text = read_source(&location.file, location.stdin)?;
    let config = config_for(&location.file)?;

    let mut editor: Editor<Navigator> = Editor::new();
    let source = editor.add_buffer(TextBuffer::new(&location.file, text));
    source.set_cursor_row(location.row);
    let nav = Navigator::prepare(source.path(), source.text(), source.cursor_row(), generate, &config)?;
    let writes = nav.generates() && !dry_run;
    let target = nav.target().to_path_buf();
    tracing::debug!(source = %nav.source_name(), target = %target.display(), "navigating");

    let outcome = match navigator::navigate(&mut editor, nav)? {
        Some(outcome) => Some(outcome),
        None => navigator::on_load(&mut editor, &target)?,
    };
    let Some(outcome) = outcome else {
        return Ok(OutputEnvelope {
            status: Some(format!("{} never finished loading", target.display())),
            ..OutputEnvelope::default()
        });
    };

    let mut envelope = OutputEnvelope::default();
    if writes && editor.modified().next().is_some() {
        if let Some(dir) = target.parent() {
            paths::ensure_package_dir(dir, &config.layout)?;
        }
        let written = editor.save_all()?;
        envelope.written = Some(written.iter().map(|p| p.display().to_string()).collect());
    } else if dry_run && editor.modified().next().is_some() {
        envelope.contents = editor.buffer(&target).map(|b| b.text().to_owned());
    }
    envelope.navigation = Some(outcome);
    Ok(envelope)
}

fn execute_index(file: &Path, stdin: bool) -> Result<OutputEnvelope> {
    let text = read_source(file, stdin)?;
    let config = config_for(file)?;
    let tree = lang::index_with(&text, config.index)?;
    Ok(OutputEnvelope {
        decls: Some(DeclEntry::from_tree(&tree)),
        ..OutputEnvelope::default()
    })
}

fn execute_audit(
    root: &Path,
    excludes: &[String],
    no_defaults: bool,
    timeout: Option<u64>,
    start: Instant,
) -> (OutputEnvelope, i32) {
    if !root.is_dir() {
        return (
            OutputEnvelope::error(format!("Directory not found: {}", root.display())),
            1,
        );
    }
    let config = match Config::discover(root) {
        Ok(c) => c,
        Err(e) => return (OutputEnvelope::error(e.to_string()), 1),
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    ctrlc_handler(&cancelled);

    if let Some(secs) = timeout {
        let cancelled = cancelled.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_secs(secs));
            cancelled.store(true, Ordering::Relaxed);
        });
    }

    let filter = exclusion::ExclusionFilter::new(excludes, no_defaults);
    let files = scanner::find_main_modules(root, &config.layout, &filter, &cancelled);
    tracing::debug!(files = files.len(), "auditing");

    let entries = if cancelled.load(Ordering::Relaxed) {
        Vec::new()
    } else {
        audit::audit_files(&files, root, &cancelled)
    };
    let timed_out = cancelled.load(Ordering::Relaxed);

    let envelope = OutputEnvelope {
        meta: Some(MetaInfo {
            elapsed_ms: start.elapsed().as_millis(),
            timeout: timed_out,
            files_scanned: files.len(),
            files_matched: entries.len(),
        }),
        audit: Some(entries),
        error: if timed_out {
            Some("Operation timed out; partial results may be incomplete".into())
        } else {
            None
        },
        ..OutputEnvelope::default()
    };
    (envelope, if timed_out { 2 } else { 0 })
}

#[cfg(unix)]
fn ctrlc_handler(cancelled: &Arc<AtomicBool>) {
    if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(cancelled)) {
        tracing::warn!(error = %e, "could not install SIGINT handler");
    }
}

#[cfg(not(unix))]
fn ctrlc_handler(_cancelled: &Arc<AtomicBool>) {}
