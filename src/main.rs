use argh::FromArgs;
use horizon_shell::{Interpreter, ShellConfig, TerminalHost, welcome_banner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// HorizonShell: an interactive command shell.
struct Cli {
    #[argh(option)]
    /// file to load command history from and append it to.
    history_file: Option<PathBuf>,

    #[argh(switch)]
    /// keep history in memory only.
    no_history: bool,

    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status.
    command: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli: Cli = argh::from_env();

    let mut config = ShellConfig::default();
    if cli.no_history {
        config.history_file = None;
    } else if let Some(path) = cli.history_file {
        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        config = config.with_history_file(path, &base);
    }
    tracing::debug!(history_file = ?config.history_file, "starting shell");

    let mut shell = Interpreter::new(config);

    if let Some(line) = cli.command {
        let mut host = TerminalHost::new(welcome_banner(shell.env()));
        let status = shell.submit(&line, &mut host);
        return ExitCode::from((status & 0xff) as u8);
    }

    match shell.repl() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("horizon_shell: {e}");
            ExitCode::FAILURE
        }
    }
}
