//! Lexical analysis for the flat command language understood by the shell.
//!
//! There is no quoting, escaping or substitution: a line is a sequence of words
//! separated by runs of space, tab, CR or LF. Three words are reserved when they
//! stand alone: `<`, `>` and `>>`.

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Any word that is not a redirection operator.
    Word(String),
    /// Input redirection symbol, `<`.
    RedirectLeft,
    /// Output redirection symbol, `>`.
    RedirectRight,
    /// Appending output redirection symbol, `>>`.
    RedirectAppend,
}

const SEPARATORS: [char; 4] = [' ', '\t', '\r', '\n'];

fn classify(word: &str) -> Token {
    match word {
        "<" => Token::RedirectLeft,
        ">" => Token::RedirectRight,
        ">>" => Token::RedirectAppend,
        other => Token::Word(other.to_string()),
    }
}

/// Splits a raw command line into tokens.
///
/// Operators are only recognized as standalone words, so `a>b` stays a single
/// [`Token::Word`].
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    line.split(SEPARATORS)
        .filter(|word| !word.is_empty())
        .map(classify)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_splits_on_mixed_whitespace() {
        let tokens = split_into_tokens("ls\t-la \r\n  /tmp");
        assert_eq!(tokens, vec![word("ls"), word("-la"), word("/tmp")]);
    }

    #[test]
    fn test_blank_line_has_no_tokens() {
        assert!(split_into_tokens("").is_empty());
        assert!(split_into_tokens(" \t \r\n").is_empty());
    }

    #[test]
    fn test_operators_only_when_standalone() {
        let tokens = split_into_tokens("sort < in >> out > x a>b");
        assert_eq!(
            tokens,
            vec![
                word("sort"),
                Token::RedirectLeft,
                word("in"),
                Token::RedirectAppend,
                word("out"),
                Token::RedirectRight,
                word("x"),
                word("a>b"),
            ]
        );
    }

    #[test]
    fn test_quotes_are_ordinary_characters() {
        let tokens = split_into_tokens("echo \"hello world\"");
        assert_eq!(tokens, vec![word("echo"), word("\"hello"), word("world\"")]);
    }
}
