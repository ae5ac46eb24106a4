use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Invocation};
use crate::completion::{Completion, PathCompleter, format_listing};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::external::ExternalCommand;
use crate::history::History;
use crate::host::{Host, Style};
use crate::parser::{self, ParsedCommand};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, see [`crate::builtin`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The builtin registry: every command the shell runs in-process.
fn default_builtins() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::utility::*;
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Clear>::default()),
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<HistoryCmd>::default()),
        Box::new(Factory::<Echo>::default()),
        Box::new(Factory::<Cat>::default()),
        Box::new(Factory::<Rm>::default()),
        Box::new(Factory::<Touch>::default()),
        Box::new(Factory::<Reverse>::default()),
        Box::new(Factory::<Countdown>::default()),
        Box::new(Factory::<Sysinfo>::default()),
        Box::new(Factory::<Search>::default()),
        Box::new(Factory::<Calc>::default()),
        Box::new(Factory::<Plot>::default()),
        Box::new(Factory::<Weather>::default()),
    ]
}

/// Greeting shown at startup and after `clear`.
pub fn welcome_banner(env: &Environment) -> String {
    let user = env.user_name();
    let mut chars = user.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!(
        "Welcome, {capitalized}!\nHorizonShell Initialized. Type 'help' for a list of commands.\n\n"
    )
}

/// One interactive shell session.
///
/// Owns the environment, history and completion state, and the registry of
/// builtins. A front end feeds it submitted lines through [`Interpreter::submit`];
/// all output goes to the [`Host`] passed along.
///
/// Example
/// ```
/// use horizon_shell::{Interpreter, MemoryHost, ShellConfig};
/// let mut sh = Interpreter::new(ShellConfig::in_memory());
/// let mut host = MemoryHost::new();
/// let code = sh.submit("reverse hello", &mut host);
/// assert_eq!(code, 0);
/// assert_eq!(host.text(), "Reversed: olleh\n");
/// ```
pub struct Interpreter {
    env: Environment,
    history: History,
    config: ShellConfig,
    completer: PathCompleter,
    commands: Vec<Box<dyn CommandFactory>>,
    last_status: ExitCode,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(ShellConfig::default())
    }
}

impl Interpreter {
    /// Create a session with the standard builtins.
    ///
    /// History is loaded from `config.history_file` when one is set.
    pub fn new(config: ShellConfig) -> Self {
        Self::with_commands(config, default_builtins())
    }

    /// Create a session with a custom set of builtin factories.
    pub fn with_commands(config: ShellConfig, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let history = match &config.history_file {
            Some(path) => History::with_file(path, config.history_capacity),
            None => History::new(config.history_capacity),
        };
        Self {
            env: Environment::new(),
            history,
            config,
            completer: PathCompleter::new(),
            commands,
            last_status: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Status of the most recent command.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// True once `exit` ran.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    pub fn prompt(&self) -> String {
        self.env.prompt()
    }

    /// Every name the builtin registry answers to, in registration order.
    pub fn builtin_names(&self) -> Vec<&'static str> {
        self.commands
            .iter()
            .flat_map(|factory| factory.names().iter().copied())
            .collect()
    }

    /// Execute one submitted line and record it in the history.
    ///
    /// Blank lines do nothing. Builtins take precedence over external programs;
    /// redirections only apply to external programs and are reported, not
    /// applied, for builtins. Returns the command's status.
    pub fn submit(&mut self, line: &str, host: &mut dyn Host) -> ExitCode {
        let line = line.trim();
        if line.is_empty() {
            return self.last_status;
        }
        self.completer.reset();

        let parsed = parser::parse(line);
        let status = if parsed.argc() == 0 {
            0
        } else if let Some(cmd) = self.find_builtin(&parsed.args) {
            if !parsed.redirection.is_empty() {
                host.append(
                    &format!("{}: redirection is not supported for builtins\n", parsed.args[0]),
                    Style::Error,
                );
            }
            self.execute(cmd, host)
        } else {
            self.run_external(parsed, host)
        };
        tracing::debug!(line, status, "command finished");

        self.history.record(line);
        self.last_status = status;
        status
    }

    /// Run `args` as a builtin if `args[0]` names one.
    ///
    /// Returns whether a builtin handled it.
    pub fn try_builtin(&mut self, args: &[String], host: &mut dyn Host) -> bool {
        match self.find_builtin(args) {
            Some(cmd) => {
                self.last_status = self.execute(cmd, host);
                true
            }
            None => false,
        }
    }

    fn find_builtin(&self, args: &[String]) -> Option<Box<dyn ExecutableCommand>> {
        let (name, rest) = args.split_first()?;
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, &rest))
    }

    fn run_external(&mut self, parsed: ParsedCommand, host: &mut dyn Host) -> ExitCode {
        let cmd = Box::new(ExternalCommand::new(parsed.args, parsed.redirection));
        self.execute(cmd, host)
    }

    fn execute(&mut self, cmd: Box<dyn ExecutableCommand>, host: &mut dyn Host) -> ExitCode {
        let mut ctx = Invocation {
            env: &mut self.env,
            history: &self.history,
            config: &self.config,
            host,
        };
        match cmd.execute(&mut ctx) {
            Ok(status) => status,
            Err(e) => {
                ctx.error(&format!("{e:#}\n"));
                1
            }
        }
    }

    /// Complete the last word of `line` against the working directory.
    ///
    /// Returns the new line text. When the same fragment is completed twice in a
    /// row and stays ambiguous, the candidates are listed on the host instead.
    pub fn complete(&mut self, line: &str, host: &mut dyn Host) -> String {
        let (start, completion) = self.completer.complete_line(line, &self.env.current_dir);
        match completion {
            Completion::Unique(text) | Completion::Partial(text) => {
                format!("{}{}", &line[..start], text)
            }
            Completion::Ambiguous(names) => {
                host.append("\n", Style::Plain);
                host.append(&format_listing(&names), Style::Plain);
                line.to_string()
            }
            Completion::None => line.to_string(),
        }
    }

    /// Forget pending double-Tab state; call on any key press other than Tab.
    pub fn reset_completion(&mut self) {
        self.completer.reset();
    }

    /// Line to show for the history-up key.
    pub fn history_previous(&mut self) -> Option<String> {
        self.history.previous().map(str::to_string)
    }

    /// Line to show for the history-down key.
    pub fn history_next(&mut self) -> Option<String> {
        self.history.next().map(str::to_string)
    }

    /// Print the welcome banner.
    pub fn greet(&self, host: &mut dyn Host) {
        host.append(&welcome_banner(&self.env), Style::Center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::MemoryHost;

    fn shell() -> Interpreter {
        let config = ShellConfig {
            countdown_tick: std::time::Duration::ZERO,
            ..ShellConfig::in_memory()
        };
        Interpreter::new(config)
    }

    #[test]
    fn test_registry_names() {
        let names = shell().builtin_names();
        for name in [
            "exit", "clear", "cd", "pwd", "help", "history", "echo", "cat", "rm", "delete",
            "touch", "mkfile", "reverse", "countdown", "sysinfo", "search", "calc", "plot",
            "weather",
        ] {
            assert!(names.contains(&name), "{name} is not registered");
        }
    }

    #[test]
    fn test_blank_line_is_a_no_op() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        sh.submit("   \t ", &mut host);
        assert_eq!(host.text(), "");
        assert!(sh.history().is_empty());
    }

    #[test]
    fn test_submit_records_after_execution() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        sh.submit("echo one", &mut host);
        sh.submit("history", &mut host);
        assert_eq!(host.text(), "one\n   1  echo one\n");
        assert_eq!(sh.history().entries(), &["echo one", "history"]);
    }

    #[test]
    fn test_builtins_are_case_sensitive() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        assert!(!sh.try_builtin(&["ECHO".to_string()], &mut host));
        assert!(sh.try_builtin(&["echo".to_string(), "x".to_string()], &mut host));
        assert_eq!(host.text(), "x\n");
    }

    #[test]
    fn test_exit_requests_stop() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        assert!(!sh.should_exit());
        sh.submit("exit", &mut host);
        assert!(sh.should_exit());
    }

    #[test]
    fn test_builtin_redirection_is_reported() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        assert_eq!(sh.submit("echo hi > out.txt", &mut host), 0);
        assert_eq!(
            host.text_with_style(Style::Error),
            "echo: redirection is not supported for builtins\n"
        );
        assert!(host.text().ends_with("hi\n"));
    }

    #[test]
    fn test_redirection_only_line_does_nothing() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        assert_eq!(sh.submit("> out.txt", &mut host), 0);
        assert_eq!(host.text(), "");
    }

    #[test]
    fn test_history_navigation_through_session() {
        let mut sh = shell();
        let mut host = MemoryHost::new();
        sh.submit("echo a", &mut host);
        sh.submit("echo b", &mut host);
        assert_eq!(sh.history_previous().as_deref(), Some("echo b"));
        assert_eq!(sh.history_previous().as_deref(), Some("echo a"));
        assert_eq!(sh.history_next().as_deref(), Some("echo b"));
        assert_eq!(sh.history_next().as_deref(), Some(""));
    }

    #[test]
    fn test_complete_lists_on_second_request() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alpha1"), "").unwrap();
        std::fs::write(dir.path().join("alpha2"), "").unwrap();
        std::fs::write(dir.path().join("beta"), "").unwrap();
        let mut sh = shell();
        sh.env_mut().current_dir = dir.path().to_path_buf();
        let mut host = MemoryHost::new();

        assert_eq!(sh.complete("cat b", &mut host), "cat beta");
        assert_eq!(sh.complete("cat a", &mut host), "cat alpha");
        assert_eq!(host.text(), "");
        assert_eq!(sh.complete("cat alpha", &mut host), "cat alpha");
        assert_eq!(host.text(), "\nalpha1\talpha2\n");
    }

    #[test]
    fn test_welcome_banner_capitalizes_user() {
        let mut env = Environment::new();
        env.set_var("USER", "alice");
        assert!(welcome_banner(&env).starts_with("Welcome, Alice!\n"));
    }
}
