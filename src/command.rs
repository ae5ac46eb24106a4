use crate::config::ShellConfig;
use crate::env::Environment;
use crate::history::History;
use crate::host::{Host, Style};
use anyhow::Result;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Everything a command may touch while it runs.
///
/// Borrowed from the [`Interpreter`](crate::Interpreter) for the duration of one
/// command, so nothing outlives the invocation.
pub struct Invocation<'a> {
    pub env: &'a mut Environment,
    pub history: &'a History,
    pub config: &'a ShellConfig,
    pub host: &'a mut dyn Host,
}

impl Invocation<'_> {
    /// Append plain text to the host.
    pub fn print(&mut self, text: &str) {
        self.host.append(text, Style::Plain);
    }

    /// Append text with a presentation style.
    pub fn print_styled(&mut self, text: &str, style: Style) {
        self.host.append(text, style);
    }

    /// Report an error line.
    pub fn error(&mut self, text: &str) {
        self.host.append(text, Style::Error);
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command, writing all output through `ctx.host`.
    fn execute(self: Box<Self>, ctx: &mut Invocation<'_>) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Names this factory answers to.
    fn names(&self) -> &'static [&'static str];

    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
