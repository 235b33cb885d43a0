//! Utility functions for error handling
//!
//! This module provides utility functions to make error handling more convenient.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Open a file for reading with the path attached to any failure
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (logged on failure)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        log::error!("Missing input for {purpose}: {}", path.display());
        return Err(PipelineError::io(
            path,
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        ));
    }

    if !path.is_file() {
        return Err(PipelineError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path is not a file"),
        ));
    }

    fs::File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            log::error!("Permission denied opening {} for {purpose}", path.display());
        }
        PipelineError::io(path, e)
    })
}

/// Create a file for writing, creating its parent directory when needed
pub fn safe_create_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    fs::File::create(path).map_err(|e| PipelineError::io(path, e))
}
