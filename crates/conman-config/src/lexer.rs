//! A hand-rolled tokenizer for the configuration file grammar.
//!
//! Grounded on `examples/original_source/server-conf.c`'s use of a generic
//! `Lex`/`lex_next` token stream: keywords, quoted strings, integers, `=`,
//! end-of-line, and end-of-file. The keyword table mirrors
//! `server_conf_strs` exactly so unrecognized-token error text matches the
//! original's wording.

use std::fmt;

/// One lexical token, carrying its own text when that text is needed by
/// the parser (keywords compare by variant; strings and integers carry
/// their value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bareword matching one of [`KEYWORDS`], identified by index.
    Keyword(Keyword),
    /// A double-quoted string literal, with escapes resolved.
    Str(String),
    /// A bare integer literal.
    Int(i64),
    /// `=`.
    Equals,
    /// End of a physical line.
    Eol,
    /// End of input.
    Eof,
    /// A lexical error: an unterminated quoted string.
    UnmatchedQuote,
    /// Any other bareword that is not a recognized keyword.
    Other(String),
}

/// Directive and value keywords recognized by the configuration grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Bps,
    Console,
    Dev,
    KeepAlive,
    Log,
    LogFile,
    LoopBack,
    Name,
    Off,
    On,
    PidFile,
    Port,
    Rst,
    Server,
    Timestamp,
}

impl Keyword {
    /// The directive keyword's canonical spelling, used in error messages
    /// the same way `server_conf_strs[LEX_UNTOK(tok)]` is in the original.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Bps => "BPS",
            Keyword::Console => "CONSOLE",
            Keyword::Dev => "DEV",
            Keyword::KeepAlive => "KEEPALIVE",
            Keyword::Log => "LOG",
            Keyword::LogFile => "LOGFILE",
            Keyword::LoopBack => "LOOPBACK",
            Keyword::Name => "NAME",
            Keyword::Off => "OFF",
            Keyword::On => "ON",
            Keyword::PidFile => "PIDFILE",
            Keyword::Port => "PORT",
            Keyword::Rst => "RST",
            Keyword::Server => "SERVER",
            Keyword::Timestamp => "TIMESTAMP",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "BPS" => Keyword::Bps,
            "CONSOLE" => Keyword::Console,
            "DEV" => Keyword::Dev,
            "KEEPALIVE" => Keyword::KeepAlive,
            "LOG" => Keyword::Log,
            "LOGFILE" => Keyword::LogFile,
            "LOOPBACK" => Keyword::LoopBack,
            "NAME" => Keyword::Name,
            "OFF" => Keyword::Off,
            "ON" => Keyword::On,
            "PIDFILE" => Keyword::PidFile,
            "PORT" => Keyword::Port,
            "RST" => Keyword::Rst,
            "SERVER" => Keyword::Server,
            "TIMESTAMP" => Keyword::Timestamp,
            _ => return None,
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => f.write_str(k.as_str()),
            Token::Str(s) => write!(f, "{s}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Equals => f.write_str("="),
            Token::Eol => f.write_str("<EOL>"),
            Token::Eof => f.write_str("<EOF>"),
            Token::UnmatchedQuote => f.write_str("<unmatched quote>"),
            Token::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Scans a configuration file's text into a stream of [`Token`]s, tracking
/// the 1-based line number of whatever was last returned.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
    line: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            text,
            line: 1,
        }
    }

    /// The 1-based line number of the token last returned by [`Self::next_token`].
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    fn skip_inline_whitespace_and_comments(&mut self) {
        loop {
            match self.chars.peek() {
                Some((_, ' ' | '\t' | '\r')) => {
                    self.chars.next();
                }
                Some((_, '#')) => {
                    while let Some((_, c)) = self.chars.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                _ => break,
            }
        }
    }

    /// Returns the next token, advancing the line counter across each `\n`
    /// consumed (whether directly or as part of whitespace skipping).
    pub fn next_token(&mut self) -> Token {
        self.skip_inline_whitespace_and_comments();

        let Some(&(start, c)) = self.chars.peek() else {
            return Token::Eof;
        };

        if c == '\n' {
            self.chars.next();
            self.line += 1;
            return Token::Eol;
        }
        if c == '=' {
            self.chars.next();
            return Token::Equals;
        }
        if c == '"' {
            return self.scan_quoted_string();
        }
        if c.is_ascii_digit() || (c == '-' && self.peek_second_is_digit()) {
            return self.scan_integer(start);
        }
        if c.is_alphabetic() || c == '_' {
            return self.scan_word(start);
        }

        // An unrecognized single-character token (e.g. a stray punctuation
        // mark); surfaced to the parser as `Other` so it reports the same
        // "unrecognized token" error the original prints for anything it
        // doesn't expect.
        self.chars.next();
        Token::Other(c.to_string())
    }

    fn peek_second_is_digit(&self) -> bool {
        let mut iter = self.chars.clone();
        iter.next();
        matches!(iter.peek(), Some((_, c)) if c.is_ascii_digit())
    }

    fn scan_quoted_string(&mut self) -> Token {
        self.chars.next(); // opening quote
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Token::Str(out),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, next)) => out.push(next),
                    None => return Token::UnmatchedQuote,
                },
                Some((_, '\n')) => return Token::UnmatchedQuote,
                Some((_, c)) => out.push(c),
                None => return Token::UnmatchedQuote,
            }
        }
    }

    fn scan_integer(&mut self, start: usize) -> Token {
        let mut end = start;
        if matches!(self.chars.peek(), Some((_, '-'))) {
            self.chars.next();
        }
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                end = idx + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let slice = &self.text[start..end.max(start + 1)];
        slice.parse().map_or(Token::Other(slice.to_string()), Token::Int)
    }

    fn scan_word(&mut self, start: usize) -> Token {
        let mut end = start;
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                end = idx + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let word = &self.text[start..end];
        let upper = word.to_ascii_uppercase();
        Keyword::from_str(&upper).map_or_else(|| Token::Other(word.to_string()), Token::Keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_console_directive() {
        let mut lexer = Lexer::new(r#"CONSOLE NAME="node1" DEV="/dev/ttyS0" BPS=9600"#);
        let tokens: Vec<_> = std::iter::from_fn(|| {
            let t = lexer.next_token();
            (t != Token::Eof).then_some(t)
        })
        .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Console),
                Token::Keyword(Keyword::Name),
                Token::Equals,
                Token::Str("node1".into()),
                Token::Keyword(Keyword::Dev),
                Token::Equals,
                Token::Str("/dev/ttyS0".into()),
                Token::Keyword(Keyword::Bps),
                Token::Equals,
                Token::Int(9600),
            ]
        );
    }

    #[test]
    fn tracks_line_numbers_across_newlines() {
        let mut lexer = Lexer::new("SERVER PORT=1\nCONSOLE");
        while lexer.next_token() != Token::Eol {}
        assert_eq!(lexer.line(), 2);
        assert_eq!(lexer.next_token(), Token::Keyword(Keyword::Console));
    }

    #[test]
    fn unterminated_string_reports_unmatched_quote() {
        let mut lexer = Lexer::new("CONSOLE NAME=\"node1");
        assert_eq!(lexer.next_token(), Token::Keyword(Keyword::Console));
        assert_eq!(lexer.next_token(), Token::Keyword(Keyword::Name));
        assert_eq!(lexer.next_token(), Token::Equals);
        assert_eq!(lexer.next_token(), Token::UnmatchedQuote);
    }

    #[test]
    fn comments_are_skipped_to_end_of_line() {
        let mut lexer = Lexer::new("# a comment\nSERVER");
        assert_eq!(lexer.next_token(), Token::Eol);
        assert_eq!(lexer.next_token(), Token::Keyword(Keyword::Server));
    }
}
