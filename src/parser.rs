use crate::lexer::{self, Token};
use std::path::PathBuf;

/// Maximum number of positional arguments kept from one command line.
///
/// Once the limit is reached the rest of the line is ignored, redirection
/// operators included.
pub const MAX_ARGS: usize = 63;

/// I/O redirection requested for a single command.
///
/// `append` is only meaningful when `output` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirection {
    /// File bound to the child's standard input (`<`).
    pub input: Option<PathBuf>,
    /// File receiving the child's standard output and error (`>` or `>>`).
    pub output: Option<PathBuf>,
    /// Open `output` in append mode instead of truncating it (`>>`).
    pub append: bool,
}

impl Redirection {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

/// Result of parsing one command line: positional arguments plus redirection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub redirection: Redirection,
}

impl ParsedCommand {
    /// Number of positional arguments, command name included.
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    pub fn name(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

struct CommandBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl CommandBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        CommandBuilder { tokens, pos: 0 }
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Takes the target of a redirection operator.
    ///
    /// Whatever token follows is the target, even another operator; an operator
    /// at the end of the line has no target.
    fn consume_target(&mut self) -> Option<PathBuf> {
        self.consume().map(|token| match token {
            Token::Word(w) => PathBuf::from(w),
            Token::RedirectLeft => PathBuf::from("<"),
            Token::RedirectRight => PathBuf::from(">"),
            Token::RedirectAppend => PathBuf::from(">>"),
        })
    }

    fn build(mut self) -> ParsedCommand {
        let mut parsed = ParsedCommand::default();

        while parsed.args.len() < MAX_ARGS {
            let Some(token) = self.consume() else {
                break;
            };
            match token {
                Token::Word(w) => parsed.args.push(w),
                Token::RedirectLeft => {
                    if let Some(target) = self.consume_target() {
                        parsed.redirection.input = Some(target);
                    }
                }
                Token::RedirectRight => {
                    if let Some(target) = self.consume_target() {
                        parsed.redirection.output = Some(target);
                        parsed.redirection.append = false;
                    }
                }
                Token::RedirectAppend => {
                    if let Some(target) = self.consume_target() {
                        parsed.redirection.output = Some(target);
                        parsed.redirection.append = true;
                    }
                }
            }
        }

        parsed
    }
}

/// Parses a raw command line into arguments and redirection targets.
///
/// Never fails: dangling operators are dropped, later operators override
/// earlier ones and arguments past [`MAX_ARGS`] are discarded.
pub fn parse(line: &str) -> ParsedCommand {
    CommandBuilder::from(lexer::split_into_tokens(line)).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parsed: &ParsedCommand) -> Vec<&str> {
        parsed.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_output_redirection() {
        let parsed = parse("ls -la > out.txt");
        assert_eq!(args(&parsed), vec!["ls", "-la"]);
        assert_eq!(
            parsed.redirection,
            Redirection {
                input: None,
                output: Some(PathBuf::from("out.txt")),
                append: false,
            }
        );
    }

    #[test]
    fn test_input_and_append_redirection() {
        let parsed = parse("sort < in.txt >> out.txt");
        assert_eq!(args(&parsed), vec!["sort"]);
        assert_eq!(parsed.redirection.input, Some(PathBuf::from("in.txt")));
        assert_eq!(parsed.redirection.output, Some(PathBuf::from("out.txt")));
        assert!(parsed.redirection.append);
    }

    #[test]
    fn test_blank_line_is_empty() {
        for line in ["", "   ", "\t\r\n"] {
            let parsed = parse(line);
            assert_eq!(parsed.argc(), 0);
            assert!(parsed.redirection.is_empty());
            assert_eq!(parsed.name(), None);
        }
    }

    #[test]
    fn test_dangling_operator_is_dropped() {
        let parsed = parse("cat file >");
        assert_eq!(args(&parsed), vec!["cat", "file"]);
        assert!(parsed.redirection.is_empty());
    }

    #[test]
    fn test_last_redirection_wins() {
        let parsed = parse("cmd >> first > second < a < b");
        assert_eq!(parsed.redirection.output, Some(PathBuf::from("second")));
        assert!(!parsed.redirection.append);
        assert_eq!(parsed.redirection.input, Some(PathBuf::from("b")));
    }

    #[test]
    fn test_operator_target_can_be_an_operator_word() {
        let parsed = parse("echo > >");
        assert_eq!(args(&parsed), vec!["echo"]);
        assert_eq!(parsed.redirection.output, Some(PathBuf::from(">")));
    }

    #[test]
    fn test_arguments_beyond_limit_are_dropped() {
        let words: Vec<String> = (0..100).map(|i| format!("a{i}")).collect();
        let line = format!("{} > out", words.join(" "));
        let parsed = parse(&line);
        assert_eq!(parsed.argc(), MAX_ARGS);
        assert_eq!(parsed.args.last().map(String::as_str), Some("a62"));
        assert!(parsed.redirection.output.is_none());
    }
}
