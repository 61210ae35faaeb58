//! Utility functions for error handling
//!
//! Helpers that open files with an error message naming what the file was
//! needed for.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, TriageError};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
///
/// # Returns
/// * `Result<fs::File>` - The opened file or an IO error naming the purpose
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.is_file() {
        return Err(TriageError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found (needed for: {purpose})", path.display()),
        )));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions".to_string(),
            _ => format!("Failed to open file for: {purpose}"),
        };
        TriageError::Io(io::Error::new(
            e.kind(),
            format!("{context}: {} ({e})", path.display()),
        ))
    })
}

/// Create a file for writing, creating missing parent directories first
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::File::create(path).map_err(|e| {
        TriageError::Io(io::Error::new(
            e.kind(),
            format!("Failed to create {} for: {purpose} ({e})", path.display()),
        ))
    })
}
