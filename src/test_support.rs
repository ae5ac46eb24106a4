use crate::command::Invocation;
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::history::History;
use crate::io_adapters::MemoryHost;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tempfile::TempDir;

/// Serializes tests that change the process working directory.
pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scratch directory plus everything needed to build an [`Invocation`].
pub(crate) struct Fixture {
    _dir: TempDir,
    pub env: Environment,
    pub history: History,
    pub config: ShellConfig,
    pub host: MemoryHost,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut env = Environment::new();
        env.current_dir = std::fs::canonicalize(dir.path()).expect("canonicalize temp dir");
        let config = ShellConfig {
            countdown_tick: Duration::ZERO,
            pump_slice: Duration::from_millis(1),
            ..ShellConfig::in_memory()
        };
        Self {
            _dir: dir,
            env,
            history: History::new(config.history_capacity),
            config,
            host: MemoryHost::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.env.current_dir
    }

    pub fn invocation(&mut self) -> Invocation<'_> {
        Invocation {
            env: &mut self.env,
            history: &self.history,
            config: &self.config,
            host: &mut self.host,
        }
    }
}
