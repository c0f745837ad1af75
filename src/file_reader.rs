use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Error, Result};

pub const MMAP_THRESHOLD: u64 = 64 * 1024;
pub const BINARY_CHECK_SIZE: usize = 8192;

/// Read `path` as UTF-8 text. `Ok(None)` means the file looks binary.
pub fn read_file(path: &Path) -> Result<Option<String>> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if metadata.len() == 0 {
        return Ok(Some(String::new()));
    }
    if metadata.len() >= MMAP_THRESHOLD {
        read_file_mmap(path)
    } else {
        read_file_buffered(path)
    }
}

/// Like [`read_file`], but a missing file reads as empty text.
pub fn read_file_or_empty(path: &Path) -> Result<Option<String>> {
    match read_file(path) {
        Err(Error::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(Some(String::new()))
        }
        other => other,
    }
}

fn read_file_mmap(path: &Path) -> Result<Option<String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(path, e))?;
    let data = &mmap[..];
    if is_binary(data) {
        return Ok(None);
    }
    decode(path, data).map(Some)
}

fn read_file_buffered(path: &Path) -> Result<Option<String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut check_buf = [0u8; BINARY_CHECK_SIZE];
    let n = reader.read(&mut check_buf).map_err(|e| Error::io(path, e))?;
    if is_binary(&check_buf[..n]) {
        return Ok(None);
    }
    let mut all = Vec::from(&check_buf[..n]);
    reader.read_to_end(&mut all).map_err(|e| Error::io(path, e))?;
    decode(path, &all).map(Some)
}

fn decode(path: &Path, data: &[u8]) -> Result<String> {
    let s = std::str::from_utf8(data).map_err(|_| Error::Read {
        path: path.to_path_buf(),
        message: "Not valid UTF-8".into(),
    })?;
    // Editors hand us text without a byte-order mark.
    Ok(s.strip_prefix('\u{feff}').unwrap_or(s).to_owned())
}

pub fn is_binary(data: &[u8]) -> bool {
    let check_len = data.len().min(BINARY_CHECK_SIZE);
    data[..check_len].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_detects_null_bytes() {
        assert!(is_binary(&[0x48, 0x65, 0x00, 0x6c]));
    }

    #[test]
    fn binary_clean_text() {
        assert!(!is_binary(b"class Foo:\n    pass\n"));
    }

    #[test]
    fn binary_empty() {
        assert!(!is_binary(&[]));
    }

    #[test]
    fn reads_small_and_large_files() {
        let tmp = tempfile::tempdir().unwrap();
        let small = tmp.path().join("small.py");
        std::fs::write(&small, "def f():\n    pass\n").unwrap();
        assert_eq!(read_file(&small).unwrap().as_deref(), Some("def f():\n    pass\n"));

        let large = tmp.path().join("large.py");
        let body = "x = 1\n".repeat((MMAP_THRESHOLD as usize / 6) + 10);
        std::fs::write(&large, &body).unwrap();
        assert_eq!(read_file(&large).unwrap().map(|s| s.len()), Some(body.len()));
    }

    #[test]
    fn empty_and_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty.py");
        std::fs::write(&empty, "").unwrap();
        assert_eq!(read_file(&empty).unwrap().as_deref(), Some(""));

        let missing = tmp.path().join("missing.py");
        assert!(matches!(read_file(&missing), Err(Error::Io { .. })));
        assert_eq!(read_file_or_empty(&missing).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("latin1.py");
        std::fs::write(&path, b"name = '\xe9'\n").unwrap();
        assert!(matches!(read_file(&path), Err(Error::Read { .. })));
    }

    #[test]
    fn byte_order_mark_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bom.py");
        std::fs::write(&path, "\u{feff}class A:\n    pass\n").unwrap();
        assert_eq!(read_file(&path).unwrap().as_deref(), Some("class A:\n    pass\n"));
    }
}
