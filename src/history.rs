//! Ordered log of executed command lines with cursor navigation.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Executed command lines, oldest first.
///
/// The cursor ranges over `0..=len`; `len` means the user is on a fresh line
/// rather than browsing an entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
    capacity: usize,
    file: Option<PathBuf>,
}

impl History {
    /// In-memory history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
            file: None,
        }
    }

    /// History backed by `path`: existing lines are loaded and every recorded
    /// line is appended to it.
    ///
    /// A missing or unreadable file yields an empty history.
    pub fn with_file(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let mut history = Self::new(capacity);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                history.entries = contents
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                let loaded = history.entries.len();
                history.trim_to_capacity();
                if history.entries.len() < loaded {
                    if let Err(e) = history.rewrite(&path) {
                        tracing::warn!("{e:#}");
                    }
                }
                tracing::debug!(
                    "loaded {} history entries from {}",
                    history.entries.len(),
                    path.display()
                );
            }
            Err(e) => {
                tracing::debug!("starting with empty history, {}: {}", path.display(), e);
            }
        }
        history.cursor = history.entries.len();
        history.file = Some(path);
        history
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Append `line` unless it repeats the most recent entry.
    ///
    /// Returns whether the line was added. The cursor is reset to the fresh
    /// line either way.
    pub fn record(&mut self, line: &str) -> bool {
        let added = if self.entries.last().is_some_and(|last| last == line) {
            false
        } else {
            self.entries.push(line.to_string());
            self.trim_to_capacity();
            if let Err(e) = self.persist(line) {
                tracing::warn!("{e:#}");
            }
            true
        };
        self.cursor = self.entries.len();
        added
    }

    /// Step back to the previous entry. Stays on the oldest entry once reached.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step forward; past the newest entry this returns the empty fresh line.
    pub fn next(&mut self) -> Option<&str> {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        Some(self.entries.get(self.cursor).map_or("", String::as_str))
    }

    fn trim_to_capacity(&mut self) {
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }

    /// Replace the contents of `path` with the current entries.
    fn rewrite(&self, path: &Path) -> Result<()> {
        let contents: String = self.entries.iter().map(|line| format!("{line}\n")).collect();
        fs::write(path, contents)
            .with_context(|| format!("history: can't rewrite {}", path.display()))
    }

    fn persist(&self, line: &str) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("history: can't open {}", path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("history: can't write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_duplicates_are_suppressed() {
        let mut history = History::new(10);
        assert!(history.record("ls"));
        assert!(!history.record("ls"));
        assert!(history.record("pwd"));
        assert!(history.record("ls"));
        assert_eq!(history.entries(), &["ls", "pwd", "ls"]);
    }

    #[test]
    fn test_cursor_navigation() {
        let mut history = History::new(10);
        history.record("one");
        history.record("two");
        history.record("three");
        assert_eq!(history.cursor(), 3);

        assert_eq!(history.previous(), Some("three"));
        assert_eq!(history.previous(), Some("two"));
        assert_eq!(history.previous(), Some("one"));
        assert_eq!(history.previous(), Some("one"));
        assert_eq!(history.cursor(), 0);

        assert_eq!(history.next(), Some("two"));
        assert_eq!(history.next(), Some("three"));
        assert_eq!(history.next(), Some(""));
        assert_eq!(history.next(), Some(""));
        assert_eq!(history.cursor(), 3);
    }

    #[test]
    fn test_record_resets_cursor() {
        let mut history = History::new(10);
        history.record("one");
        history.record("two");
        history.previous();
        history.previous();
        history.record("two");
        assert_eq!(history.cursor(), history.len());
    }

    #[test]
    fn test_empty_history_navigation() {
        let mut history = History::new(10);
        assert_eq!(history.previous(), None);
        assert_eq!(history.next(), Some(""));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = History::new(2);
        history.record("a");
        history.record("b");
        history.record("c");
        assert_eq!(history.entries(), &["b", "c"]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");

        let mut history = History::with_file(&path, 100);
        assert!(history.is_empty());
        history.record("echo one");
        history.record("echo one");
        history.record("pwd");

        assert_eq!(fs::read_to_string(&path).unwrap(), "echo one\npwd\n");

        let mut reloaded = History::with_file(&path, 100);
        assert_eq!(reloaded.entries(), &["echo one", "pwd"]);
        assert_eq!(reloaded.cursor(), 2);
        assert_eq!(reloaded.previous(), Some("pwd"));
    }

    #[test]
    fn test_oversized_file_is_trimmed_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "a\nb\n\nc\nd\n").unwrap();

        let mut history = History::with_file(&path, 3);
        assert_eq!(history.entries(), &["b", "c", "d"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "b\nc\nd\n");

        history.record("e");
        assert_eq!(fs::read_to_string(&path).unwrap(), "b\nc\nd\ne\n");
        assert_eq!(History::with_file(&path, 3).entries(), &["c", "d", "e"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "c\nd\ne\n");
    }

    #[test]
    fn test_file_within_capacity_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "a\n\nb\n").unwrap();
        let history = History::with_file(&path, 3);
        assert_eq!(history.entries(), &["a", "b"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n\nb\n");
    }

    #[test]
    fn test_unreadable_file_means_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt");
        fs::write(&path, [0xff, 0xfe, b'\n', 0x80]).unwrap();
        let history = History::with_file(&path, 100);
        assert!(history.is_empty());
        assert_eq!(history.file(), Some(path.as_path()));
    }
}
