//! Terminal front end: a `rustyline` line editor driving an [`Interpreter`].

use crate::completion::{Completion, PathCompleter, find_completion_matches};
use crate::host::{Host, Style};
use crate::interpreter::{Interpreter, welcome_banner};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;

/// [`Host`] writing to the terminal with ANSI colors.
pub struct TerminalHost {
    banner: String,
}

impl TerminalHost {
    /// `banner` is redrawn after every `clear`.
    pub fn new(banner: String) -> Self {
        Self { banner }
    }

    /// Wrap `text` in the escape sequences for `style`.
    pub fn paint(text: &str, style: Style) -> String {
        match style {
            Style::Plain => text.to_string(),
            Style::Prompt => format!("\x1b[1;32m{text}\x1b[0m"),
            Style::Error => format!("\x1b[31m{text}\x1b[0m"),
            Style::Highlight => format!("\x1b[36m{text}\x1b[0m"),
            Style::Center => format!("\x1b[1m{}\x1b[0m", center(text, terminal_width())),
        }
    }
}

impl Host for TerminalHost {
    fn append(&mut self, text: &str, style: Style) {
        let mut out = io::stdout().lock();
        if let Err(e) = out
            .write_all(Self::paint(text, style).as_bytes())
            .and_then(|()| out.flush())
        {
            tracing::debug!("terminal write failed: {e}");
        }
    }

    fn clear(&mut self) {
        self.append("\x1b[2J\x1b[H", Style::Plain);
        let banner = self.banner.clone();
        self.append(&banner, Style::Center);
    }
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|&w| w > 0)
        .unwrap_or(80)
}

/// Pad every line of `text` so it sits in the middle of `width` columns.
fn center(text: &str, width: usize) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            let content = line.trim_end_matches('\n');
            let len = content.chars().count();
            if content.is_empty() || len >= width {
                line.to_string()
            } else {
                format!("{}{}", " ".repeat((width - len) / 2), line)
            }
        })
        .collect()
}

/// Keeps Ctrl-C from killing the shell while a submitted line runs.
///
/// SIGINT gets a no-op handler rather than `SIG_IGN`: handlers are reset to the
/// default on exec, so a running child is still interrupted.
struct InterruptGuard {
    #[cfg(unix)]
    previous: Option<libc::sighandler_t>,
}

impl InterruptGuard {
    #[cfg(unix)]
    fn new() -> Self {
        extern "C" fn on_interrupt(_signal: libc::c_int) {}
        let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
        // SAFETY: the handler does nothing, so it is async-signal-safe.
        let previous = unsafe { libc::signal(libc::SIGINT, handler) };
        if previous == libc::SIG_ERR {
            tracing::debug!("could not install SIGINT handler: {}", io::Error::last_os_error());
            return Self { previous: None };
        }
        Self {
            previous: Some(previous),
        }
    }

    #[cfg(not(unix))]
    fn new() -> Self {
        Self {}
    }
}

#[cfg(unix)]
impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous {
            // SAFETY: restores the disposition returned by `signal` above.
            unsafe { libc::signal(libc::SIGINT, previous) };
        }
    }
}

/// rustyline helper providing Tab completion of paths.
struct ShellHelper {
    completer: RefCell<PathCompleter>,
    cwd: PathBuf,
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let (start, completion) = self.completer.borrow_mut().complete_line(line, &self.cwd);
        let candidates = match completion {
            Completion::None => Vec::new(),
            Completion::Unique(text) => vec![Pair {
                display: text.clone(),
                replacement: text,
            }],
            // Hand rustyline every match: List mode inserts the common prefix
            // and lists the candidates on the next consecutive Tab.
            Completion::Partial(_) | Completion::Ambiguous(_) => {
                self.completer.borrow_mut().reset();
                let fragment = &line[start..];
                let split = fragment.rfind('/').map_or(0, |i| i + 1);
                let (dir_part, partial) = fragment.split_at(split);
                find_completion_matches(&self.cwd.join(dir_part), partial)
                    .into_iter()
                    .map(|(name, is_dir)| Pair {
                        replacement: format!("{dir_part}{name}{}", if is_dir { "/" } else { "" }),
                        display: name,
                    })
                    .collect()
            }
        };
        Ok((start, candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

impl Interpreter {
    /// Interactive read-eval-print loop on the terminal.
    ///
    /// Runs until `exit` or end of input. Ctrl-C abandons the current line, or
    /// interrupts the running command without ending the shell.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .max_history_size(self.config().history_capacity)?
            .build();
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::with_config(config)?;
        rl.set_helper(Some(ShellHelper {
            completer: RefCell::new(PathCompleter::new()),
            cwd: self.env().current_dir.clone(),
        }));
        for line in self.history().entries() {
            rl.add_history_entry(line.as_str())?;
        }

        let mut host = TerminalHost::new(welcome_banner(self.env()));
        self.greet(&mut host);

        while !self.should_exit() {
            if let Some(helper) = rl.helper_mut() {
                helper.cwd = self.env().current_dir.clone();
                helper.completer.borrow_mut().reset();
            }
            let prompt = TerminalHost::paint(&self.prompt(), Style::Prompt);
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim())?;
                    }
                    let _interrupts = InterruptGuard::new();
                    self.submit(&line, &mut host);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
