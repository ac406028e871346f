//! Write the parsed result as one JSON document.

use crate::processor::ParsedResult;
use std::fs;
use std::io;
use std::path::Path;

pub fn emit(result: &ParsedResult, path: &Path, pretty: bool) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let bytes = result.to_document(pretty)?;
    fs::write(path, bytes)
}
