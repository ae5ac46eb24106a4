use crate::command::{ExecutableCommand, ExitCode, Invocation};
use crate::host::Style;
use crate::parser::Redirection;
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

/// Size of one read from the child's output pipe.
pub const READ_BUF_SIZE: usize = 4096;

/// Exit status reported when a redirection target can't be opened.
pub const EXIT_REDIRECT_FAILED: ExitCode = 1;
/// Exit status reported when the program exists but can't be executed.
pub const EXIT_CANNOT_EXECUTE: ExitCode = 126;
/// Exit status reported when the program can't be found.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// How an external command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child ran (or failed before exec) and exited with this status.
    Exited(ExitCode),
    /// The child was killed by this signal.
    Signaled(i32),
    /// No child could be created at all.
    SpawnFailed,
}

impl ExitOutcome {
    /// Shell-style status: signals map to `128 + signal`.
    pub fn code(self) -> ExitCode {
        match self {
            ExitOutcome::Exited(code) => code,
            ExitOutcome::Signaled(signal) => 128 + signal,
            ExitOutcome::SpawnFailed => 1,
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitOutcome::Exited(code),
            None => terminated_by_signal(status),
        }
    }
}

/// Command that is not a builtin.
pub struct ExternalCommand {
    args: Vec<String>,
    redirection: Redirection,
}

impl ExternalCommand {
    pub fn new(args: Vec<String>, redirection: Redirection) -> Self {
        Self { args, redirection }
    }

    /// Spawn the child, stream its output to the host, reap it and report a
    /// non-zero or abnormal exit.
    ///
    /// Never fails: every problem is reported through the host and reflected in
    /// the returned outcome.
    pub fn run(&self, ctx: &mut Invocation<'_>) -> ExitOutcome {
        let Some(program) = self.args.first() else {
            return ExitOutcome::Exited(0);
        };
        let outcome = self.spawn_and_stream(program, ctx);
        report_outcome(outcome, ctx);
        outcome
    }

    fn spawn_and_stream(&self, program: &str, ctx: &mut Invocation<'_>) -> ExitOutcome {
        let search_paths = ctx.env.get_var("PATH").unwrap_or_default();
        let Some(executable) = find_command_path(
            OsStr::new(&search_paths),
            &ctx.env.current_dir,
            Path::new(program),
        ) else {
            ctx.error(&format!("{program}: command not found\n"));
            return ExitOutcome::Exited(EXIT_NOT_FOUND);
        };

        let mut command = Command::new(executable.as_ref());
        command
            .args(&self.args[1..])
            .envs(ctx.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&ctx.env.current_dir);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.arg0(program);
        }

        match &self.redirection.input {
            Some(input) => match File::open(ctx.env.resolve(input)) {
                Ok(file) => {
                    command.stdin(file);
                }
                Err(e) => {
                    ctx.error(&format!("{}: {}\n", input.display(), e));
                    return ExitOutcome::Exited(EXIT_REDIRECT_FAILED);
                }
            },
            None => {
                command.stdin(Stdio::inherit());
            }
        }

        let reader = match &self.redirection.output {
            Some(output) => {
                let opened = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .append(self.redirection.append)
                    .truncate(!self.redirection.append)
                    .open(ctx.env.resolve(output));
                let file = match opened {
                    Ok(file) => file,
                    Err(e) => {
                        ctx.error(&format!("{}: {}\n", output.display(), e));
                        return ExitOutcome::Exited(EXIT_REDIRECT_FAILED);
                    }
                };
                let stderr = match file.try_clone() {
                    Ok(f) => f,
                    Err(e) => {
                        ctx.error(&format!("System Error: Unable to duplicate output file: {e}\n"));
                        return ExitOutcome::SpawnFailed;
                    }
                };
                command.stdout(file).stderr(stderr);
                None
            }
            None => {
                let (reader, writer) = match io::pipe() {
                    Ok(pair) => pair,
                    Err(e) => {
                        ctx.error(&format!("System Error: Unable to create internal pipe: {e}\n"));
                        return ExitOutcome::SpawnFailed;
                    }
                };
                let stderr = match writer.try_clone() {
                    Ok(w) => w,
                    Err(e) => {
                        ctx.error(&format!("System Error: Unable to create internal pipe: {e}\n"));
                        return ExitOutcome::SpawnFailed;
                    }
                };
                command.stdout(writer).stderr(stderr);
                Some(reader)
            }
        };

        let spawned = command.spawn();
        // The command keeps the parent's copies of the pipe's write end; drop it
        // so the read side sees end-of-stream once the child exits.
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => return spawn_failure(program, &e, ctx),
        };
        tracing::debug!(pid = child.id(), program, "spawned external command");

        let mut ends_with_newline = true;
        if let Some(mut reader) = reader {
            ends_with_newline = stream_output(&mut reader, ctx);
        }

        match reap(&mut child, ctx) {
            Ok(status) => {
                let outcome = ExitOutcome::from_status(status);
                tracing::debug!(pid = child.id(), ?outcome, "reaped external command");
                if !ends_with_newline && outcome != ExitOutcome::Exited(0) {
                    ctx.print("\n");
                }
                outcome
            }
            Err(e) => {
                ctx.error(&format!("\nError waiting for child process: {e}\n"));
                ExitOutcome::SpawnFailed
            }
        }
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        Ok(self.run(ctx).code())
    }
}

fn spawn_failure(program: &str, e: &io::Error, ctx: &mut Invocation<'_>) -> ExitOutcome {
    tracing::warn!(program, "spawn failed: {e}");
    match e.kind() {
        io::ErrorKind::NotFound => {
            ctx.error(&format!("{program}: {e}\n"));
            ExitOutcome::Exited(EXIT_NOT_FOUND)
        }
        io::ErrorKind::PermissionDenied => {
            ctx.error(&format!("{program}: {e}\n"));
            ExitOutcome::Exited(EXIT_CANNOT_EXECUTE)
        }
        _ => {
            ctx.error(&format!("System Error: Could not spawn child process: {e}\n"));
            ExitOutcome::SpawnFailed
        }
    }
}

/// Forward everything the child writes to the host, one bounded read at a time.
///
/// Returns whether the streamed text ended with a newline.
fn stream_output(reader: &mut impl Read, ctx: &mut Invocation<'_>) -> bool {
    let mut buffer = [0u8; READ_BUF_SIZE];
    let mut decoder = Utf8Stream::default();
    let mut ends_with_newline = true;
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.push(&buffer[..n]);
                if !text.is_empty() {
                    ends_with_newline = text.ends_with('\n');
                    ctx.print(&text);
                }
                ctx.host.pump_events();
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                ctx.error(&format!("\nError reading command output: {e}\n"));
                return true;
            }
        }
    }
    let rest = decoder.finish();
    if !rest.is_empty() {
        ends_with_newline = rest.ends_with('\n');
        ctx.print(&rest);
    }
    ends_with_newline
}

/// Wait for the child, pumping host events while it is still running.
fn reap(child: &mut Child, ctx: &mut Invocation<'_>) -> io::Result<ExitStatus> {
    let max_slice = ctx.config.pump_slice.max(Duration::from_millis(1));
    let mut slice = Duration::from_millis(1);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        ctx.host.pump_events();
        std::thread::sleep(slice);
        slice = (slice * 2).min(max_slice);
    }
}

fn report_outcome(outcome: ExitOutcome, ctx: &mut Invocation<'_>) {
    match outcome {
        ExitOutcome::Exited(0) | ExitOutcome::SpawnFailed => {}
        ExitOutcome::Exited(code) => {
            ctx.error(&format!("Process exited with status {code}\n"));
        }
        ExitOutcome::Signaled(signal) => {
            let message = match signal_name(signal) {
                Some(name) => format!("Process terminated by signal {signal} ({name})\n"),
                None => format!("Process terminated by signal {signal}\n"),
            };
            ctx.print_styled(&message, Style::Error);
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitOutcome {
    use std::os::unix::process::ExitStatusExt;
    match exit_status.signal() {
        Some(signal) => ExitOutcome::Signaled(signal),
        None => ExitOutcome::Exited(-1),
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitOutcome {
    ExitOutcome::Exited(-1)
}

#[cfg(unix)]
fn signal_name(signal: i32) -> Option<&'static str> {
    Some(match signal {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGUSR1 => "SIGUSR1",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGUSR2 => "SIGUSR2",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGALRM => "SIGALRM",
        libc::SIGTERM => "SIGTERM",
        _ => return None,
    })
}

#[cfg(not(unix))]
fn signal_name(_signal: i32) -> Option<&'static str> {
    None
}

/// Incremental UTF-8 decoder for streamed output.
///
/// A multibyte character split across two reads is held back until its tail
/// arrives; genuinely invalid bytes are replaced lossily.
#[derive(Debug, Default)]
struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        let mut rest: &[u8] = &self.pending;
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: wait for its tail.
                        None => break,
                    }
                }
            }
        }
        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        text
    }

    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`) or `./`-prefixed: resolved
///   against `cwd`, returned if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first regular file with that name.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered relative to `cwd` or via PATH lookup.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    cwd: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => {
            // Empty path -> not found
            None
        }
        (Some(x), None) if !path.starts_with(".") => {
            // Single component -> search in PATH
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            // Multiple components or ./ prefix -> relative to the working directory
            let candidate = cwd.join(path);
            find_by_path(&candidate).map(|p| Cow::Owned(p.to_path_buf()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|path| path.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
