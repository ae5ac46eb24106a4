use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the history file inside the home directory.
pub const HISTORY_FILE_NAME: &str = ".horizon_shell_history";

/// Tunables of an interactive session.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Where history is loaded from and appended to. `None` keeps history in memory only.
    pub history_file: Option<PathBuf>,
    /// Maximum number of entries kept in memory.
    pub history_capacity: usize,
    /// Interval between `countdown` ticks.
    pub countdown_tick: Duration,
    /// Longest stretch of blocking work between two host event pumps.
    pub pump_slice: Duration,
    /// Connect/read timeout for network builtins.
    pub http_timeout: Duration,
    /// Base URL of the weather service queried by `weather`.
    pub weather_endpoint: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            history_capacity: 1000,
            countdown_tick: Duration::from_secs(1),
            pump_slice: Duration::from_millis(50),
            http_timeout: Duration::from_secs(10),
            weather_endpoint: "http://wttr.in".to_string(),
        }
    }
}

impl ShellConfig {
    /// Configuration without any file persistence; used by embedders and tests.
    pub fn in_memory() -> Self {
        Self {
            history_file: None,
            ..Self::default()
        }
    }

    /// Use `path` as history file, made absolute against `base` so that a later
    /// `cd` does not move it.
    pub fn with_history_file(mut self, path: impl AsRef<Path>, base: &Path) -> Self {
        let path = path.as_ref();
        self.history_file = Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        });
        self
    }
}

fn default_history_file() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(HISTORY_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_history_file_is_anchored() {
        let config = ShellConfig::in_memory().with_history_file("hist", Path::new("/var/tmp"));
        assert_eq!(config.history_file, Some(PathBuf::from("/var/tmp/hist")));
    }

    #[test]
    fn test_absolute_history_file_is_kept() {
        let config = ShellConfig::in_memory().with_history_file("/a/b", Path::new("/var/tmp"));
        assert_eq!(config.history_file, Some(PathBuf::from("/a/b")));
    }

    #[test]
    fn test_in_memory_has_no_file() {
        let config = ShellConfig::in_memory();
        assert!(config.history_file.is_none());
        assert_eq!(config.history_capacity, 1000);
        assert_eq!(config.countdown_tick, Duration::from_secs(1));
    }
}
