use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Path, PathBuf};

use crate::error::IngestError;

/// A file discovered by [`discover`], ready for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
  pub path: PathBuf,
  pub file_type: String,
}

/// Walks `paths`, expanding directories, respecting `.gitignore` and honoring
/// `file_patterns` as glob include filters (empty means "all files"). A bare
/// file path in `paths` is always included regardless of `file_patterns`.
pub fn discover(paths: &[String], recursive: bool, file_patterns: &[String]) -> Result<Vec<DiscoveredFile>, IngestError> {
  let mut out = Vec::new();

  for raw in paths {
    let path = PathBuf::from(raw);
    if !path.exists() {
      return Err(IngestError::UnsupportedFileType(format!("path does not exist: {raw}")));
    }

    if path.is_file() {
      if let Some(file_type) = crate::parser::file_type_for(&path) {
        out.push(DiscoveredFile { path, file_type });
      }
      continue;
    }

    out.extend(walk_directory(&path, recursive, file_patterns)?);
  }

  Ok(out)
}

fn walk_directory(root: &Path, recursive: bool, file_patterns: &[String]) -> Result<Vec<DiscoveredFile>, IngestError> {
  let mut overrides = OverrideBuilder::new(root);
  for pattern in file_patterns {
    overrides.add(pattern).map_err(|e| IngestError::UnsupportedFileType(e.to_string()))?;
  }
  let overrides = overrides.build().map_err(|e| IngestError::UnsupportedFileType(e.to_string()))?;

  let mut builder = WalkBuilder::new(root);
  builder.hidden(false).git_ignore(true).git_global(true).git_exclude(true).overrides(overrides);
  if !recursive {
    builder.max_depth(Some(1));
  }

  let mut out = Vec::new();
  for entry in builder.build() {
    let entry = entry.map_err(|e| IngestError::UnsupportedFileType(e.to_string()))?;
    if entry.file_type().is_none_or(|ft| ft.is_dir()) {
      continue;
    }
    let path = entry.path().to_path_buf();
    if let Some(file_type) = crate::parser::file_type_for(&path) {
      out.push(DiscoveredFile { path, file_type });
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn discovers_files_in_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "# A").unwrap();
    std::fs::write(dir.path().join("b.txt"), "b").unwrap();

    let files = discover(&[dir.path().to_string_lossy().into_owned()], true, &[]).unwrap();
    assert_eq!(files.len(), 2);
  }

  #[test]
  fn respects_gitignore() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".gitignore"), "ignored/\n").unwrap();
    std::fs::write(dir.path().join("a.md"), "# A").unwrap();
    std::fs::create_dir(dir.path().join("ignored")).unwrap();
    std::fs::write(dir.path().join("ignored/b.md"), "# B").unwrap();

    let files = discover(&[dir.path().to_string_lossy().into_owned()], true, &[]).unwrap();
    assert_eq!(files.len(), 1);
  }

  #[test]
  fn file_patterns_filter_by_glob() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "# A").unwrap();
    std::fs::write(dir.path().join("b.txt"), "b").unwrap();

    let files = discover(&[dir.path().to_string_lossy().into_owned()], true, &["*.md".to_string()]).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_type, "md");
  }

  #[test]
  fn non_recursive_skips_nested_dirs() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.md"), "# A").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested/b.md"), "# B").unwrap();

    let files = discover(&[dir.path().to_string_lossy().into_owned()], false, &[]).unwrap();
    assert_eq!(files.len(), 1);
  }

  #[test]
  fn a_bare_file_path_is_always_included() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.weird_ext");
    std::fs::write(&path, "x").unwrap();
    let files = discover(&[path.to_string_lossy().into_owned()], true, &["*.md".to_string()]).unwrap();
    assert_eq!(files.len(), 1);
  }

  #[test]
  fn missing_path_is_an_error() {
    let err = discover(&["/nonexistent/path/xyz".to_string()], true, &[]).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFileType(_)));
  }
}
