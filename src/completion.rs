//! Tab completion of file and directory names.

use std::fs;
use std::path::{Path, PathBuf};

/// Names per row when listing ambiguous matches.
pub const LISTING_COLUMNS: usize = 5;

/// Outcome of one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matches.
    None,
    /// Exactly one match; the full replacement fragment, with a trailing `/`
    /// for directories.
    Unique(String),
    /// Several matches; the fragment extended to their longest common prefix.
    Partial(String),
    /// Several matches and the fragment is what the previous request
    /// completed to; every matching name, sorted.
    Ambiguous(Vec<String>),
}

/// Completes path fragments against the filesystem.
///
/// Remembers the text its last ambiguous completion produced, so that a
/// second request on that text lists the candidates instead of completing again.
#[derive(Debug, Default)]
pub struct PathCompleter {
    last_fragment: Option<String>,
}

impl PathCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the double-request state; call on any other key press.
    pub fn reset(&mut self) {
        self.last_fragment = None;
    }

    /// Complete `fragment`, resolving relative directories against `cwd`.
    pub fn complete(&mut self, fragment: &str, cwd: &Path) -> Completion {
        let (dir_part, partial) = match fragment.rfind('/') {
            Some(i) => fragment.split_at(i + 1),
            None => ("", fragment),
        };
        let dir: PathBuf = if dir_part.is_empty() {
            cwd.to_path_buf()
        } else {
            cwd.join(dir_part)
        };

        let matches = find_completion_matches(&dir, partial);
        tracing::debug!(fragment, matches = matches.len(), "path completion");
        let repeated = self.last_fragment.as_deref() == Some(fragment);

        match matches.as_slice() {
            [] => {
                self.reset();
                Completion::None
            }
            [(name, is_dir)] => {
                self.reset();
                let slash = if *is_dir { "/" } else { "" };
                Completion::Unique(format!("{dir_part}{name}{slash}"))
            }
            _ => {
                let names: Vec<String> = matches.iter().map(|(name, _)| name.clone()).collect();
                if repeated {
                    self.reset();
                    Completion::Ambiguous(names)
                } else {
                    let extended = format!("{dir_part}{}", longest_common_prefix(&names));
                    self.last_fragment = Some(extended.clone());
                    Completion::Partial(extended)
                }
            }
        }
    }

    /// Complete the last whitespace-delimited word of `line`.
    ///
    /// Returns the byte offset where that word starts together with the completion.
    pub fn complete_line(&mut self, line: &str, cwd: &Path) -> (usize, Completion) {
        let start = line.rfind([' ', '\t']).map_or(0, |i| i + 1);
        (start, self.complete(&line[start..], cwd))
    }
}

/// Entries of `dir` whose names start with `partial`, sorted by name, each with
/// whether it is a directory.
///
/// Hidden entries are only offered when `partial` itself starts with `.`.
/// An unreadable directory has no matches.
pub fn find_completion_matches(dir: &Path, partial: &str) -> Vec<(String, bool)> {
    let show_hidden = partial.starts_with('.');
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut matches: Vec<(String, bool)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(partial) || (name.starts_with('.') && !show_hidden) {
                return None;
            }
            Some((name, entry.path().is_dir()))
        })
        .collect();
    matches.sort();
    matches
}

/// Longest prefix shared by every name, on character boundaries.
pub fn longest_common_prefix(names: &[String]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };
    let mut len = first.len();
    for name in rest {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(len);
    }
    first[..len].to_string()
}

/// Lay out names in rows of [`LISTING_COLUMNS`], tab separated.
pub fn format_listing(names: &[String]) -> String {
    names
        .chunks(LISTING_COLUMNS)
        .map(|row| format!("{}\n", row.join("\t")))
        .collect()
}
