//! Reading captured command output.
//!
//! The offline decoder takes output saved from an earlier session, either
//! from a file or piped on stdin.

use crate::error::{IoError, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Maximum input size accepted (256MB).
const MAX_INPUT_SIZE: u64 = 256 * 1024 * 1024;

/// Reads a file to string.
///
/// # Errors
///
/// Returns an error if the file doesn't exist, is too large, can't be
/// read, or is not valid UTF-8.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path_ref = path.as_ref();
    let path_str = path_ref.to_string_lossy().to_string();

    if !path_ref.exists() {
        return Err(IoError::FileNotFound { path: path_str }.into());
    }

    let read_failed = |reason: String| IoError::ReadFailed {
        path: path_str.clone(),
        reason,
    };

    let file = File::open(path_ref).map_err(|e| read_failed(e.to_string()))?;
    let size = file
        .metadata()
        .map_err(|e| read_failed(e.to_string()))?
        .len();
    if size > MAX_INPUT_SIZE {
        return Err(read_failed(format!(
            "file too large: {size} bytes (max: {MAX_INPUT_SIZE} bytes)"
        ))
        .into());
    }

    decode_utf8(read_all(file).map_err(|e| read_failed(e.to_string()))?)
        .map_err(|reason| read_failed(reason).into())
}

/// Reads all of stdin to string.
///
/// # Errors
///
/// Returns an error if stdin can't be read or is not valid UTF-8.
pub fn read_stdin() -> Result<String> {
    let bytes = read_all(io::stdin().lock()).map_err(|e| IoError::Generic(e.to_string()))?;
    decode_utf8(bytes).map_err(|reason| {
        IoError::ReadFailed {
            path: "<stdin>".to_string(),
            reason,
        }
        .into()
    })
}

/// Reads from `path`, or from stdin when no path (or `-`) is given.
///
/// # Errors
///
/// See [`read_file`] and [`read_stdin`].
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => read_file(p),
        _ => read_stdin(),
    }
}

fn read_all<R: Read>(reader: R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    reader.take(MAX_INPUT_SIZE + 1).read_to_end(&mut buffer)?;
    if buffer.len() as u64 > MAX_INPUT_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("input exceeds {MAX_INPUT_SIZE} bytes"),
        ));
    }
    Ok(buffer)
}

fn decode_utf8(bytes: Vec<u8>) -> std::result::Result<String, String> {
    String::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_small_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "alias\n-----\njdoe").unwrap();

        let content = read_file(file.path()).unwrap();
        assert_eq!(content, "alias\n-----\njdoe");
    }

    #[test]
    fn test_read_nonexistent_file() {
        let err = read_file("/nonexistent/capture.txt").unwrap_err();
        assert!(matches!(err, Error::Io(IoError::FileNotFound { .. })));
    }

    #[test]
    fn test_read_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();

        let err = read_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid UTF-8"));
    }

    #[test]
    fn test_read_input_prefers_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Ångström").unwrap();

        let content = read_input(Some(file.path())).unwrap();
        assert_eq!(content, "Ångström");
    }

    #[test]
    fn test_read_all_limit() {
        let data = vec![b'x'; 16];
        assert_eq!(read_all(data.as_slice()).unwrap().len(), 16);
    }
}
