//! Directory listing used to discover candidate files.

use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::error::BatchError;

/// List the names of all files under `directory`, recursively, sorted.
///
/// Only file names are returned, not paths; files with the same name in
/// different subdirectories appear once per occurrence.
pub fn list_files(directory: &Path) -> Result<Vec<String>> {
    if !directory.is_dir() {
        return Err(BatchError::invalid(format!(
            "{} is not a valid directory.",
            directory.display()
        ))
        .into());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", directory.display()))?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use std::fs;

    #[test]
    fn lists_nested_files_by_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("b.py"), "").expect("write");
        fs::create_dir(temp.path().join("pkg")).expect("mkdir");
        fs::write(temp.path().join("pkg").join("a.py"), "").expect("write");

        let names = list_files(temp.path()).expect("list");
        assert_eq!(names, vec!["a.py", "b.py"]);
    }

    #[test]
    fn empty_directory_lists_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(list_files(temp.path()).expect("list").is_empty());
    }

    #[test]
    fn non_directory_is_invalid() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("file.txt");
        fs::write(&file, "").expect("write");

        let err = list_files(&file).unwrap_err();
        assert!(classify(&err).is_some_and(BatchError::is_invalid_argument));
        assert!(err.to_string().contains("is not a valid directory"));
    }
}
