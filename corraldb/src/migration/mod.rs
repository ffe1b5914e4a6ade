use crate::error::{ErrorKind, Result, StoreError};
use std::path::{Path, PathBuf};

/// One migration version: a directory whose name parses as a positive
/// integer, holding one or more SQL files applied in file-name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub path: PathBuf,
}

impl Migration {
    /// The version's `*.sql` files, lexicographic by file name.
    pub fn sql_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().map(|e| e == "sql").unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Concatenated SQL of the version's files, in application order.
    pub fn load_sql(&self) -> Result<String> {
        let mut sql = String::new();
        for file in self.sql_files()? {
            let content = std::fs::read_to_string(&file)?;
            sql.push_str(&content);
            if !sql.ends_with('\n') {
                sql.push('\n');
            }
        }
        Ok(sql)
    }
}

impl PartialOrd for Migration {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Migration {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}

/// Enumerate migration versions under `root`: immediate child directories
/// whose names parse as positive integers, ascending. Other entries are
/// ignored. Version numbers need not be contiguous.
pub fn discover(root: &Path) -> Result<Vec<Migration>> {
    if !root.is_dir() {
        return Err(StoreError::new(
            ErrorKind::FileNotFound,
            format!("migration directory does not exist: {}", root.display()),
        )
        .with_context(format!("directory '{}'", root.display())));
    }

    let mut versions = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Ok(version) = name.parse::<i64>() {
            if version > 0 {
                versions.push(Migration {
                    version,
                    path: entry.path(),
                });
            }
        }
    }

    versions.sort();
    Ok(versions)
}

/// Filter discovered versions to those strictly above the persisted version.
pub fn pending(migrations: Vec<Migration>, current_version: i64) -> Vec<Migration> {
    migrations
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect()
}
