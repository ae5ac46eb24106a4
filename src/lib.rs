//! HorizonShell: the command engine of an interactive terminal shell.
//!
//! A submitted line is tokenized, split into arguments and `<`, `>`, `>>`
//! redirections, then either run by one of the in-process builtins or spawned
//! as an external program whose combined stdout/stderr is streamed back in
//! chunks. Output never goes to a fixed stream: everything is appended to a
//! [`Host`], the narrow interface to whatever front end displays it. The same
//! engine therefore drives the bundled terminal REPL and an in-memory
//! [`MemoryHost`] used by tests.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and
//! [`env`] expose the traits and types for implementing your own commands.

mod builtin;
pub mod calc;
pub mod command;
pub mod completion;
pub mod config;
pub mod env;
pub mod external;
pub mod history;
pub mod host;
pub mod http;
mod interpreter;
mod io_adapters;
mod lexer;
pub mod parser;
mod repl;
#[cfg(test)]
mod test_support;
mod utility;

pub use completion::{Completion, PathCompleter};
pub use config::ShellConfig;
pub use external::ExitOutcome;
pub use history::History;
pub use host::{Host, Style};
/// Just a convenient re-export of the shell session.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, welcome_banner};
pub use io_adapters::{Chunk, MemoryHost};
pub use parser::{ParsedCommand, Redirection, parse};
pub use repl::TerminalHost;
