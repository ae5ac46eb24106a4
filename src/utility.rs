//! The "creative & utility" builtins.

use crate::builtin::{BuiltinCommand, usage};
use crate::calc;
use crate::command::{ExitCode, Invocation};
use crate::host::{Style, cooperative_sleep};
use crate::http;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Implements [`FromArgs`] by taking the arguments verbatim.
///
/// For commands whose operands may legitimately start with `-` (`calc -3+1`,
/// `plot -2 5`), which argh would reject as unknown flags.
macro_rules! verbatim_args {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl FromArgs for $ty {
                fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
                    Ok(Self {
                        args: args.iter().map(|s| s.to_string()).collect(),
                    })
                }
            }
        )+
    };
}

verbatim_args!(Reverse, Countdown, Calc, Plot);

/// Reverse a string.
pub struct Reverse {
    args: Vec<String>,
}

impl BuiltinCommand for Reverse {
    fn names() -> &'static [&'static str] {
        &["reverse"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let Some(text) = self.args.first() else {
            return usage(ctx, "Usage: reverse <text>\n");
        };
        let mut bytes = text.as_bytes().to_vec();
        bytes.reverse();
        let reversed = String::from_utf8_lossy(&bytes);
        ctx.print_styled(&format!("Reversed: {reversed}\n"), Style::Highlight);
        Ok(0)
    }
}

/// Count down from N, one tick apart.
pub struct Countdown {
    args: Vec<String>,
}

impl BuiltinCommand for Countdown {
    fn names() -> &'static [&'static str] {
        &["countdown"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let Some(arg) = self.args.first() else {
            ctx.print_styled("Usage: countdown <number>\n", Style::Center);
            return Ok(1);
        };
        let seconds = match arg.parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                ctx.error("Invalid input: Countdown time must be a positive integer.\n");
                return Ok(1);
            }
        };
        let (tick, slice) = (ctx.config.countdown_tick, ctx.config.pump_slice);
        for left in (1..=seconds).rev() {
            ctx.print(&format!("Time left : {left}\n"));
            cooperative_sleep(&mut *ctx.host, tick, slice);
        }
        ctx.print_styled("Countdown complete. Blast off!\n", Style::Center);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Display basic system information.
pub struct Sysinfo {}

struct SystemInfo {
    os: String,
    hostname: String,
    kernel: String,
    version: String,
    arch: String,
}

#[cfg(unix)]
fn system_info() -> std::io::Result<SystemInfo> {
    fn field(raw: &[libc::c_char]) -> String {
        let bytes: Vec<u8> = raw
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    let mut info = std::mem::MaybeUninit::<libc::utsname>::zeroed();
    // SAFETY: uname fills the struct it is given; it is zero-initialized so every
    // field stays NUL-terminated even if uname writes nothing.
    let rc = unsafe { libc::uname(info.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: zeroed memory is a valid utsname and uname succeeded.
    let info = unsafe { info.assume_init() };
    Ok(SystemInfo {
        os: field(&info.sysname),
        hostname: field(&info.nodename),
        kernel: field(&info.release),
        version: field(&info.version),
        arch: field(&info.machine),
    })
}

#[cfg(not(unix))]
fn system_info() -> std::io::Result<SystemInfo> {
    Ok(SystemInfo {
        os: std::env::consts::OS.to_string(),
        hostname: crate::env::host_name(),
        kernel: "unknown".to_string(),
        version: "unknown".to_string(),
        arch: std::env::consts::ARCH.to_string(),
    })
}

impl BuiltinCommand for Sysinfo {
    fn names() -> &'static [&'static str] {
        &["sysinfo"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let info = system_info().context("Error: Unable to fetch system information")?;
        ctx.print_styled(
            &format!(
                "System Information:\n  OS       : {}\n  Hostname : {}\n  Kernel   : {}\n  Version  : {}\n  Arch     : {}\n",
                info.os, info.hostname, info.kernel, info.version, info.arch
            ),
            Style::Highlight,
        );
        Ok(0)
    }
}

/// Recursively search for entries whose name contains a pattern.
///
/// A leading `-r` makes the pattern a regular expression; every other
/// argument is an operand, so patterns may start with `-`.
pub struct Search {
    pub regex: bool,
    /// Pattern, then the directory to start from (defaults to the current one).
    pub args: Vec<String>,
}

impl FromArgs for Search {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let (regex, rest) = match args.split_first() {
            Some((&"-r", rest)) => (true, rest),
            _ => (false, args),
        };
        Ok(Self {
            regex,
            args: rest.iter().map(|s| s.to_string()).collect(),
        })
    }
}

enum NameMatcher {
    Substring(String),
    Regex(Regex),
}

impl NameMatcher {
    fn is_match(&self, name: &str) -> bool {
        match self {
            NameMatcher::Substring(pattern) => name.contains(pattern.as_str()),
            NameMatcher::Regex(re) => re.is_match(name),
        }
    }
}

impl Search {
    /// Depth-first walk in name order. Symlinked directories are listed but
    /// not entered; unreadable directories are skipped.
    fn walk(
        ctx: &mut Invocation<'_>,
        shown: &Path,
        matcher: &NameMatcher,
        matches: &mut usize,
    ) {
        let dir = ctx.env.resolve(shown);
        let mut entries: Vec<fs::DirEntry> = match fs::read_dir(&dir) {
            Ok(iter) => iter.filter_map(|entry| entry.ok()).collect(),
            Err(e) => {
                tracing::debug!("search: skipping {}: {e}", dir.display());
                return;
            }
        };
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path: PathBuf = shown.join(entry.file_name());
            if matcher.is_match(&entry.file_name().to_string_lossy()) {
                *matches += 1;
                ctx.print(&format!("{}\n", path.display()));
            }
            ctx.host.pump_events();
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                Self::walk(ctx, &path, matcher, matches);
            }
        }
    }
}

impl BuiltinCommand for Search {
    fn names() -> &'static [&'static str] {
        &["search"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let Some(pattern) = self.args.first() else {
            return usage(ctx, "Usage: search [-r] <pattern> [directory]\n");
        };
        let start = self.args.get(1).map_or(".", String::as_str);
        let matcher = if self.regex {
            NameMatcher::Regex(
                Regex::new(pattern).with_context(|| format!("search: invalid pattern '{pattern}'"))?,
            )
        } else {
            NameMatcher::Substring(pattern.clone())
        };

        ctx.print(&format!("Searching for '{pattern}' in '{start}'...\n"));
        fs::read_dir(ctx.env.resolve(start))
            .with_context(|| format!("search: cannot open '{start}'"))?;

        let mut matches = 0;
        Self::walk(ctx, Path::new(start), &matcher, &mut matches);
        ctx.print_styled(
            &format!("\nSearch complete. Found {matches} match(es).\n"),
            Style::Highlight,
        );
        Ok(0)
    }
}

/// Evaluate an arithmetic expression.
pub struct Calc {
    args: Vec<String>,
}

impl BuiltinCommand for Calc {
    fn names() -> &'static [&'static str] {
        &["calc"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        if self.args.is_empty() {
            return usage(
                ctx,
                "Usage: calc <expression>\n  Example: calc 5 * (2+10) / 2\n",
            );
        }
        let expression = self.args.join(" ");
        match calc::evaluate(&expression) {
            Ok(value) => {
                ctx.print_styled(
                    &format!("Result => {}\n", calc::format_g(value)),
                    Style::Center,
                );
                Ok(0)
            }
            Err(e) => {
                ctx.error(&format!(
                    "Calculation error at character {}: '{}' ({})\n",
                    e.position, expression, e.kind
                ));
                Ok(1)
            }
        }
    }
}

/// Draw a horizontal bar chart.
pub struct Plot {
    args: Vec<String>,
}

/// Width of the longest bar.
const MAX_BAR_WIDTH: f64 = 50.0;

impl BuiltinCommand for Plot {
    fn names() -> &'static [&'static str] {
        &["plot"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        if self.args.is_empty() {
            return usage(ctx, "Usage: plot <number1> <number2> ...\n");
        }
        let mut values = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            match arg.parse::<f64>() {
                Ok(v) if v.is_finite() => values.push(v),
                _ => bail!("plot: '{arg}' is not a number"),
            }
        }

        let max = values.iter().copied().fold(0.0, f64::max);
        if max <= 0.0 {
            ctx.error("Cannot plot zero or negative values.\n");
            return Ok(1);
        }

        let chart: String = values
            .iter()
            .map(|&v| {
                let width = if v > 0.0 {
                    ((v / max * MAX_BAR_WIDTH) as usize).max(1)
                } else {
                    0
                };
                format!("  {:>10} | {}\n", calc::format_g(v), ".".repeat(width))
            })
            .collect();
        ctx.print(&chart);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Show the current weather for a location.
pub struct Weather {
    #[argh(positional)]
    /// city or place; the service guesses from your IP when omitted.
    pub location: Option<String>,
}

/// Query string asking the service for a one-line report.
const WEATHER_FORMAT: &str = "format=%l:%20%C%20%t%20%w";

/// `{endpoint}/{location}?format=...`, with `location` percent-encoded as one
/// path segment.
fn weather_url(endpoint: &str, location: Option<&str>) -> Result<http::Url> {
    let mut url = http::Url::parse(endpoint)
        .with_context(|| format!("weather: invalid endpoint '{endpoint}'"))?;
    if let Some(location) = location {
        url.path_segments_mut()
            .map_err(|()| anyhow!("weather: endpoint '{endpoint}' cannot take a path"))?
            .pop_if_empty()
            .push(location);
    }
    url.set_query(Some(WEATHER_FORMAT));
    Ok(url)
}

impl BuiltinCommand for Weather {
    fn names() -> &'static [&'static str] {
        &["weather"]
    }

    fn execute(self, ctx: &mut Invocation<'_>) -> Result<ExitCode> {
        let url = weather_url(&ctx.config.weather_endpoint, self.location.as_deref())?;
        ctx.print_styled("Fetching weather...\n", Style::Highlight);
        tracing::debug!(%url, "fetching weather");

        let timeout = ctx.config.http_timeout;
        let response = http::get(&url, timeout, &mut *ctx.host).context("weather")?;
        if !response.is_success() {
            bail!("weather: HTTP {} {}", response.status, response.reason);
        }
        ctx.print_styled(response.body_text().trim_end(), Style::Center);
        ctx.print("\n");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandFactory;
    use crate::interpreter::Factory;
    use crate::test_support::Fixture;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn run<T: BuiltinCommand + 'static>(fx: &mut Fixture, name: &str, args: &[&str]) -> ExitCode {
        let cmd = Factory::<T>::default()
            .try_create(&fx.env, name, args)
            .expect("factory should recognize its own name");
        cmd.execute(&mut fx.invocation()).unwrap()
    }

    #[test]
    fn test_reverse() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Reverse>(&mut fx, "reverse", &["hello", "ignored"]), 0);
        assert_eq!(fx.host.text_with_style(Style::Highlight), "Reversed: olleh\n");

        run::<Reverse>(&mut fx, "reverse", &["-abc"]);
        assert!(fx.host.text().ends_with("Reversed: cba-\n"));
    }

    #[test]
    fn test_reverse_without_argument_prints_usage() {
        let mut fx = Fixture::new();
        run::<Reverse>(&mut fx, "reverse", &[]);
        assert_eq!(fx.host.text(), "Usage: reverse <text>\n");
    }

    #[test]
    fn test_reverse_multibyte_is_lossy() {
        let mut fx = Fixture::new();
        run::<Reverse>(&mut fx, "reverse", &["aé"]);
        let text = fx.host.text();
        assert!(text.starts_with("Reversed: "));
        assert!(text.contains('\u{fffd}'));
        assert!(text.ends_with("a\n"));
    }

    #[test]
    fn test_countdown_sequence() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Countdown>(&mut fx, "countdown", &["3"]), 0);
        assert_eq!(
            fx.host.text(),
            "Time left : 3\nTime left : 2\nTime left : 1\nCountdown complete. Blast off!\n"
        );
        assert!(fx.host.pump_count() >= 3);
    }

    #[test]
    fn test_countdown_rejects_non_positive() {
        for bad in ["0", "-3", "abc"] {
            let mut fx = Fixture::new();
            assert_eq!(run::<Countdown>(&mut fx, "countdown", &[bad]), 1);
            assert_eq!(
                fx.host.text_with_style(Style::Error),
                "Invalid input: Countdown time must be a positive integer.\n"
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_sysinfo_layout() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Sysinfo>(&mut fx, "sysinfo", &[]), 0);
        let text = fx.host.text();
        assert!(text.starts_with("System Information:\n  OS       : "));
        for label in ["Hostname : ", "Kernel   : ", "Version  : ", "Arch     : "] {
            assert!(text.contains(label), "missing {label}");
        }
    }

    fn search_tree(fx: &Fixture) {
        let root = fx.dir();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("src/main.rs"), "").unwrap();
        fs::write(root.join("src/nested/main_test.rs"), "").unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
    }

    #[test]
    fn test_search_substring() {
        let mut fx = Fixture::new();
        search_tree(&fx);
        assert_eq!(run::<Search>(&mut fx, "search", &["main"]), 0);
        assert_eq!(
            fx.host.text(),
            "Searching for 'main' in '.'...\n\
             ./src/main.rs\n\
             ./src/nested/main_test.rs\n\
             \nSearch complete. Found 2 match(es).\n"
        );
    }

    #[test]
    fn test_search_regex_in_directory() {
        let mut fx = Fixture::new();
        search_tree(&fx);
        assert_eq!(run::<Search>(&mut fx, "search", &["-r", r"^\w+\.rs$", "src"]), 0);
        let text = fx.host.text();
        assert!(text.contains("src/lib.rs\n"));
        assert!(text.contains("src/main.rs\n"));
        assert!(text.contains("src/nested/main_test.rs\n"));
        assert!(text.ends_with("Found 3 match(es).\n"));
    }

    #[test]
    fn test_search_pattern_may_start_with_dash() {
        let mut fx = Fixture::new();
        fs::write(fx.dir().join("-x.log"), "").unwrap();
        fs::write(fx.dir().join("plain.log"), "").unwrap();
        assert_eq!(run::<Search>(&mut fx, "search", &["-x", "."]), 0);
        assert_eq!(
            fx.host.text(),
            "Searching for '-x' in '.'...\n./-x.log\n\nSearch complete. Found 1 match(es).\n"
        );

        let mut fx = Fixture::new();
        fs::write(fx.dir().join("-r"), "").unwrap();
        assert_eq!(run::<Search>(&mut fx, "search", &["-r", "^-r$"]), 0);
        assert!(fx.host.text().ends_with("Found 1 match(es).\n"));
    }

    #[test]
    fn test_search_invalid_regex() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Search>(&mut fx, "search", &["-r", "("]), 1);
        assert!(fx.host.text().starts_with("search: invalid pattern '('"));
    }

    #[test]
    fn test_search_missing_directory() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Search>(&mut fx, "search", &["x", "nowhere"]), 1);
        assert!(fx.host.text_with_style(Style::Error).starts_with("search: cannot open 'nowhere'"));
    }

    #[test]
    #[cfg(unix)]
    fn test_search_does_not_follow_symlink_cycles() {
        let mut fx = Fixture::new();
        fs::create_dir(fx.dir().join("loop")).unwrap();
        std::os::unix::fs::symlink(fx.dir(), fx.dir().join("loop/back")).unwrap();
        assert_eq!(run::<Search>(&mut fx, "search", &["back"]), 0);
        assert!(fx.host.text().ends_with("Found 1 match(es).\n"));
    }

    #[test]
    fn test_calc() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Calc>(&mut fx, "calc", &["5", "*", "(2+10)", "/", "2"]), 0);
        assert_eq!(fx.host.text_with_style(Style::Center), "Result => 30\n");

        let mut fx = Fixture::new();
        run::<Calc>(&mut fx, "calc", &["-1/3"]);
        assert_eq!(fx.host.text(), "Result => -0.333333\n");
    }

    #[test]
    fn test_calc_error_reports_position() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Calc>(&mut fx, "calc", &["5", "+", "*", "2"]), 1);
        assert_eq!(
            fx.host.text_with_style(Style::Error),
            "Calculation error at character 5: '5 + * 2' (unexpected '*')\n"
        );
    }

    #[test]
    fn test_plot() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Plot>(&mut fx, "plot", &["10", "5", "0.01", "-2"]), 0);
        let expected = format!(
            "  {:>10} | {}\n  {:>10} | {}\n  {:>10} | {}\n  {:>10} | \n",
            "10",
            ".".repeat(50),
            "5",
            ".".repeat(25),
            "0.01",
            ".",
            "-2"
        );
        assert_eq!(fx.host.text(), expected);
    }

    #[test]
    fn test_plot_rejects_non_positive_and_garbage() {
        let mut fx = Fixture::new();
        assert_eq!(run::<Plot>(&mut fx, "plot", &["0", "-1"]), 1);
        assert_eq!(fx.host.text(), "Cannot plot zero or negative values.\n");

        let mut fx = Fixture::new();
        assert_eq!(run::<Plot>(&mut fx, "plot", &["1", "two"]), 1);
        assert_eq!(fx.host.text(), "plot: 'two' is not a number\n");
    }

    #[test]
    fn test_weather_against_local_service() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Length: 25\r\nConnection: close\r\n\r\nParis: Sunny +21C 10km/h\n",
                )
                .unwrap();
            request_line
        });

        let mut fx = Fixture::new();
        fx.config.weather_endpoint = format!("http://127.0.0.1:{port}");
        assert_eq!(run::<Weather>(&mut fx, "weather", &["Paris"]), 0);
        assert_eq!(
            fx.host.text(),
            "Fetching weather...\nParis: Sunny +21C 10km/h\n"
        );
        assert_eq!(
            fx.host.text_with_style(Style::Center),
            "Paris: Sunny +21C 10km/h"
        );
        assert_eq!(
            server.join().unwrap(),
            "GET /Paris?format=%l:%20%C%20%t%20%w HTTP/1.1\r\n"
        );
    }

    #[test]
    fn test_weather_reports_transport_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut fx = Fixture::new();
        fx.config.weather_endpoint = format!("http://127.0.0.1:{port}");
        assert_eq!(run::<Weather>(&mut fx, "weather", &[]), 1);
        assert!(fx.host.text_with_style(Style::Error).starts_with("weather: could not reach"));
    }

    #[test]
    fn test_weather_url_encodes_location() {
        let url = weather_url("http://wttr.in", Some("São Paulo")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://wttr.in/S%C3%A3o%20Paulo?format=%l:%20%C%20%t%20%w"
        );

        let url = weather_url("http://wttr.in/", Some("a/b?c")).unwrap();
        assert_eq!(url.path(), "/a%2Fb%3Fc");

        let url = weather_url("http://wttr.in", None).unwrap();
        assert_eq!(url.as_str(), "http://wttr.in/?format=%l:%20%C%20%t%20%w");

        assert!(weather_url("not a url", Some("Paris")).is_err());
    }
}
