//! Manifest reader.
//!
//! One app per line: `<owner/repo> <dirName> [composeFile]`.
//! Blank lines and `#` comments are ignored. Lines that cannot be
//! used are skipped with a warning; a bad line never aborts the run.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{DeployError, DeployResult};

/// One deployable application from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    /// `owner/name` used to build the clone URL.
    pub repo: String,
    /// Unique key, also the clone directory name for prod.
    pub dir_name: String,
    /// Compose file named explicitly in the manifest.
    pub compose_file: Option<String>,
    /// 1-based manifest line number.
    pub line: usize,
}

impl AppEntry {
    #[must_use]
    pub fn new(repo: &str, dir_name: &str) -> Self {
        Self {
            repo: repo.to_string(),
            dir_name: dir_name.to_string(),
            compose_file: None,
            line: 0,
        }
    }

    #[must_use]
    pub fn compose_file(mut self, name: &str) -> Self {
        self.compose_file = Some(name.to_string());
        self
    }
}

/// Whether `name` is usable as a directory key.
#[must_use]
pub fn is_valid_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Open a manifest file and iterate its entries lazily.
pub fn open(path: &Path) -> DeployResult<Entries<BufReader<File>>> {
    if !path.is_file() {
        return Err(DeployError::ManifestNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    Ok(entries(BufReader::new(file)))
}

/// Iterate the entries of any line source.
pub fn entries<R: BufRead>(reader: R) -> Entries<R> {
    Entries {
        lines: reader.lines(),
        line: 0,
        seen: HashSet::new(),
        skipped: 0,
    }
}

/// Lazy iterator over manifest entries, in file order.
pub struct Entries<R> {
    lines: Lines<R>,
    line: usize,
    seen: HashSet<String>,
    skipped: usize,
}

impl<R> Entries<R> {
    /// Number of lines skipped so far.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    fn parse_line(&mut self, raw: &str) -> Option<AppEntry> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = trimmed
            .split_whitespace()
            .take_while(|f| !f.starts_with('#'))
            .take(3)
            .collect();

        let (repo, dir_name) = match fields.as_slice() {
            [repo, dir_name, ..] => (*repo, *dir_name),
            _ => {
                tracing::warn!(
                    line = self.line,
                    "skipping malformed manifest line (need repo and directory): {trimmed}"
                );
                self.skipped += 1;
                return None;
            }
        };

        if !is_valid_dir_name(dir_name) {
            tracing::warn!(
                line = self.line,
                "skipping manifest line: invalid directory name '{dir_name}'"
            );
            self.skipped += 1;
            return None;
        }

        if !self.seen.insert(dir_name.to_string()) {
            tracing::warn!(
                line = self.line,
                "skipping manifest line: directory '{dir_name}' already listed"
            );
            self.skipped += 1;
            return None;
        }

        Some(AppEntry {
            repo: repo.to_string(),
            dir_name: dir_name.to_string(),
            compose_file: fields.get(2).map(|f| (*f).to_string()),
            line: self.line,
        })
    }
}

impl<R: BufRead> Iterator for Entries<R> {
    type Item = DeployResult<AppEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if let Some(entry) = self.parse_line(&raw) {
                return Some(Ok(entry));
            }
        }
    }
}
