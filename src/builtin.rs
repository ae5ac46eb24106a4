use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Invocation};
use crate::env::Environment;
use crate::host::Style;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs::{self, OpenOptions};
use std::time::SystemTime;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Names the command answers to; the first one is canonical.
    fn names() -> &'static [&'static str];

    /// Executes the command, writing its output through `ctx`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        match T::execute(*self, ctx) {
            Ok(x) => Ok(x),
            Err(e) => {
                ctx.error(&format!("{e:#}\n"));
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let style = if self.is_error {
            Style::Error
        } else {
            Style::Highlight
        };
        ctx.print_styled(&self.output, style);
        if !self.output.ends_with('\n') {
            ctx.print_styled("\n", style);
        }
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn names(&self) -> &'static [&'static str] {
        T::names()
    }

    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if T::names().contains(&name) {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Print a usage line in the highlight style and report failure.
pub(crate) fn usage(ctx: &mut Invocation<'_>, text: &str) -> Result<ExitCode> {
    ctx.print_styled(text, Style::Highlight);
    Ok(1)
}

#[derive(FromArgs)]
/// Close the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn names() -> &'static [&'static str] {
        &["exit"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        ctx.env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Clear the terminal screen.
pub struct Clear {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Clear {
    fn names() -> &'static [&'static str] {
        &["clear"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        ctx.host.clear();
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn names() -> &'static [&'static str] {
        &["pwd"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let dir = ctx.env.current_dir.to_string_lossy().into_owned();
        ctx.print("Current working directory is : ");
        ctx.print_styled(&format!("{dir}\n"), Style::Center);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    /// Anything after the first directory is ignored.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn names() -> &'static [&'static str] {
        &["cd"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let requested = self.targets.into_iter().next().filter(|t| !t.is_empty());
        let target = match &requested {
            Some(t) => ctx.env.resolve(t),
            None => ctx.env.home_dir(),
        };
        let shown = requested.unwrap_or_else(|| target.to_string_lossy().into_owned());

        let canonical = fs::canonicalize(&target)
            .with_context(|| format!("Error: Could not change directory to '{shown}'"))?;
        env::set_current_dir(&canonical)
            .with_context(|| format!("Error: Could not change directory to '{shown}'"))?;
        ctx.env.current_dir = canonical;
        Ok(0)
    }
}

const HELP_TEXT: &str = "HorizonShell Built-in Commands:

--- Standard ---
  help                 - Shows this help message.
  exit                 - Closes the shell.
  clear                - Clears the terminal screen.
  cd [dir]             - Changes the current directory.
  pwd                  - Prints the current working directory.
  echo [-n] [text]     - Prints text to the screen.
  cat <file...>        - Displays the content of one or more files.
  touch <file...>      - Creates files or updates their timestamp.
  mkfile <file...>     - Same as touch.
  rm <file...>         - Deletes one or more files.
  delete <file...>     - Same as rm.
  history              - Displays command history.
  search [-r] <pat> [dir]
                       - Recursively searches for file names matching a pattern.

--- Creative & Utility ---
  calc <expression>    - Evaluates a mathematical expression (e.g., '5 * (2+3)').
  plot <nums...>       - Displays a text-based bar chart of numbers.
  weather [location]   - Shows the current weather for a location.
  sysinfo              - Displays basic system information.
  reverse <text>       - Reverses a string.
  countdown <secs>     - Starts a countdown for a given number of seconds.

Redirection is supported for external commands (e.g., ls > out.txt).
";

#[derive(FromArgs)]
/// List the built-in commands.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn names() -> &'static [&'static str] {
        &["help"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        ctx.print_styled(HELP_TEXT, Style::Highlight);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display the command history, oldest first.
pub struct HistoryCmd {}

impl BuiltinCommand for HistoryCmd {
    fn names() -> &'static [&'static str] {
        &["history"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let listing: String = ctx
            .history
            .entries()
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:4}  {}\n", i + 1, line))
            .collect();
        ctx.print(&listing);
        Ok(0)
    }
}

/// Write the arguments separated by spaces, then a newline unless the first
/// argument is `-n`.
///
/// Any other operand is printed as-is, even when it starts with `-`.
pub struct Echo {
    pub no_newline: bool,
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let (no_newline, rest) = match args.split_first() {
            Some((&"-n", rest)) => (true, rest),
            _ => (false, args),
        };
        Ok(Self {
            no_newline,
            args: rest.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn names() -> &'static [&'static str] {
        &["echo"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let mut s = self.args.join(" ");
        if !self.no_newline {
            s.push('\n');
        }
        ctx.print(&s);
        Ok(0)
    }
}

/// Run `op` on every file, reporting each failure as `{cmd}: {file}: {err}`.
///
/// Returns 1 if any file failed.
fn for_each_file(
    ctx: &mut Invocation<'_>,
    cmd: &str,
    files: &[String],
    mut op: impl FnMut(&mut Invocation<'_>, &str) -> Result<()>,
) -> ExitCode {
    let mut status = 0;
    for file in files {
        if let Err(e) = op(ctx, file) {
            ctx.error(&format!("{cmd}: {file}: {e:#}\n"));
            status = 1;
        }
    }
    status
}

#[derive(FromArgs)]
/// Display the content of one or more files.
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn names() -> &'static [&'static str] {
        &["cat"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        if self.files.is_empty() {
            return usage(ctx, "Usage: cat <file1> [file2] ...\n");
        }
        Ok(for_each_file(ctx, "cat", &self.files, |ctx, file| {
            let bytes = fs::read(ctx.env.resolve(file))?;
            ctx.print(&String::from_utf8_lossy(&bytes));
            ctx.host.pump_events();
            Ok(())
        }))
    }
}

#[derive(FromArgs)]
/// Delete one or more files.
pub struct Rm {
    #[argh(positional, greedy)]
    /// files to delete.
    pub files: Vec<String>,
}

impl BuiltinCommand for Rm {
    fn names() -> &'static [&'static str] {
        &["rm", "delete"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        if self.files.is_empty() {
            return usage(ctx, "Usage: rm <file1> [file2] ...\n");
        }
        Ok(for_each_file(ctx, "rm", &self.files, |ctx, file| {
            fs::remove_file(ctx.env.resolve(file))?;
            Ok(())
        }))
    }
}

#[derive(FromArgs)]
/// Create files or update their modification time.
pub struct Touch {
    #[argh(positional, greedy)]
    /// files to create or touch.
    pub files: Vec<String>,
}

impl BuiltinCommand for Touch {
    fn names() -> &'static [&'static str] {
        &["touch", "mkfile"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        if self.files.is_empty() {
            return usage(ctx, "Usage: touch <file1> [file2] ...\n");
        }
        Ok(for_each_file(ctx, "touch", &self.files, |ctx, file| {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(ctx.env.resolve(file))?;
            f.set_modified(SystemTime::now())?;
            Ok(())
        }))
    }
}
