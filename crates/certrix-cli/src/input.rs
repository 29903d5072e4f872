//! Reading command inputs and writing artifacts.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use certrix_pki::service::{SOURCE_FILE, SOURCE_PASTED, decode_base64};

use crate::error::CliError;

/// Input path meaning standard input.
pub const STDIN: &str = "-";

/// Reads the raw bytes of `path`, or of stdin for `-`.
///
/// # Errors
///
/// Returns an error if reading fails.
pub fn read_input(path: &str) -> Result<Vec<u8>, CliError> {
    let mut bytes = Vec::new();
    if path == STDIN {
        io::stdin().lock().read_to_end(&mut bytes)?;
    } else {
        bytes = fs::read(path)?;
    }
    Ok(bytes)
}

/// Reads an input and optionally decodes it from base64 text.
///
/// # Errors
///
/// Returns an error if reading fails, the base64 input is not UTF-8 or not
/// valid base64.
pub fn load(path: &str, base64: bool) -> Result<Vec<u8>, CliError> {
    let bytes = read_input(path)?;
    if !base64 {
        return Ok(bytes);
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| CliError::InvalidArgument("base64 input is not UTF-8".into()))?;
    Ok(decode_base64(&text)?)
}

/// File name component of an input path. `None` for stdin.
#[must_use]
pub fn file_name(path: &str) -> Option<String> {
    if path == STDIN {
        return None;
    }
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Source label of an input for previews.
#[must_use]
pub fn source_label(path: &str, base64: bool) -> String {
    file_name(path).unwrap_or_else(|| {
        if base64 {
            SOURCE_FILE.to_string()
        } else {
            SOURCE_PASTED.to_string()
        }
    })
}

/// Writes `bytes` as `dir/name`, creating `dir` when missing.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be written.
pub fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, CliError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}
