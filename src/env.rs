use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: set by the `exit` builtin; the host loop stops once it is true.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`. The `should_exit` flag is initialized to `false`.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Home directory: `$HOME` when set and non-empty, else the filesystem root.
    pub fn home_dir(&self) -> PathBuf {
        match self.get_var("HOME") {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => PathBuf::from("/"),
        }
    }

    /// Resolve `path` against the shell's working directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Login name of the user running the shell.
    pub fn user_name(&self) -> String {
        self.get_var("USER")
            .or_else(|| self.get_var("LOGNAME"))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "user".to_string())
    }

    /// Prompt in the form `user@host dir$ `, with the home directory shown as `~`.
    pub fn prompt(&self) -> String {
        format!(
            "{}@{} {}$ ",
            self.user_name(),
            host_name(),
            abbreviate_home(&self.current_dir, &self.home_dir())
        )
    }
}

/// Replace a leading `home` in `dir` by `~`.
pub fn abbreviate_home(dir: &Path, home: &Path) -> String {
    if home != Path::new("/") {
        if let Ok(rest) = dir.strip_prefix(home) {
            return if rest.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rest.display())
            };
        }
    }
    dir.display().to_string()
}

/// Host name of the machine, or `localhost` when it can't be determined.
#[cfg(unix)]
pub fn host_name() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes; gethostname
    // NUL-terminates on success when the name fits.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    match String::from_utf8_lossy(&buf[..len]).into_owned() {
        name if name.is_empty() => "localhost".to_string(),
        name => name,
    }
}

#[cfg(not(unix))]
pub fn host_name() -> String {
    stdenv::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}
