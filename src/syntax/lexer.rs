//! This lexer tokenizes line-oriented assembly source.
//!
//! Tokens are produced lazily, one physical line at a time. The lexer never
//! rejects input: it only splits lines into runs and records where every run
//! came from. Deciding whether a run is a valid mnemonic, name or integer is
//! the parser's job.
use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;

/// Comment markers. A comment runs to the end of its line.
pub const COMMENT_CHARS: &[char] = &[';', '#'];

/// Continuous runs of these characters are joined into one token, which is
/// how `**`, `<<` and `>>` come out as single operators.
const JOINED: &str = "*<>";

/// Each of these characters is always a token on its own.
const SINGLE: &str = "-~+/^&|%:,[]();#";

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// A mnemonic, name, number or punctuation fragment.
    Text,
    /// Semantic end of a statement. One per source line with content.
    Newline,
    /// Sentinel ending the stream.
    Eof,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Absolute byte offset of the first byte of the token.
    pub start: usize,
    /// Absolute byte offset one past the last byte of the token.
    pub end: usize,
    /// The full source line, including its line break.
    pub line: Arc<str>,
    /// Absolute byte offset of the start of `line`.
    pub line_start: usize,
    /// 1-based line number.
    pub line_num: usize,
    /// 0-based byte column within `line`.
    pub col: usize,
}

impl Token {
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }

    pub fn is_newline(&self) -> bool {
        self.kind == TokenKind::Newline
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Text => write!(f, "'{}'", self.text),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum CharClass {
    Space,
    Joined,
    Single,
    Word,
}

fn char_class(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if JOINED.contains(c) {
        CharClass::Joined
    } else if SINGLE.contains(c) {
        CharClass::Single
    } else {
        CharClass::Word
    }
}

/// Splits a line into maximal runs of one character class, returning each
/// run with its byte column. `Single` characters never form runs.
fn split_runs(line: &str) -> Vec<(usize, &str)> {
    let mut runs = Vec::new();
    let mut run_start = 0;
    let mut last: Option<CharClass> = None;

    for (idx, c) in line.char_indices() {
        let class = char_class(c);
        if let Some(prev) = last {
            if prev != class || class == CharClass::Single {
                runs.push((run_start, &line[run_start..idx]));
                run_start = idx;
            }
        }
        last = Some(class);
    }
    if run_start < line.len() {
        runs.push((run_start, &line[run_start..]));
    }

    runs
}

fn is_comment_line(line: &str) -> bool {
    let stripped = line.trim();
    stripped.is_empty() || stripped.starts_with(COMMENT_CHARS)
}

/// Turns one line into its `Text` tokens followed by a `Newline`.
/// Blank and comment-only lines produce nothing.
fn tokenize_line(line: Arc<str>, line_start: usize, line_num: usize) -> VecDeque<Token> {
    let mut out: VecDeque<Token> = VecDeque::with_capacity(8);
    if is_comment_line(&line) {
        return out;
    }

    for (col, part) in split_runs(&line) {
        if part.trim().is_empty() {
            continue;
        }
        if part.starts_with(COMMENT_CHARS) {
            break;
        }

        out.push_back(Token {
            kind: TokenKind::Text,
            text: part.to_owned(),
            start: line_start + col,
            end: line_start + col + part.len(),
            line: Arc::clone(&line),
            line_start,
            line_num,
            col,
        });
    }

    // Every line handed in here ends with a line break.
    let col = line.len() - 1;
    out.push_back(Token {
        kind: TokenKind::Newline,
        text: "\n".to_owned(),
        start: line_start + col,
        end: line_start + col + 1,
        line: Arc::clone(&line),
        line_start,
        line_num,
        col,
    });

    out
}

pub struct Lexer<R> {
    reader: R,
    pending: VecDeque<Token>,
    line_num: usize,
    pos: usize,
    done: bool,
}

impl<R: BufRead> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Lexer {
            reader,
            pending: VecDeque::new(),
            line_num: 0,
            pos: 0,
            done: false,
        }
    }

    /// Reads the next physical line, inserting a line break if the input
    /// ended without one. Read errors end the input.
    fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        match self.reader.read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if !buf.ends_with('\n') {
                    buf.push('\n');
                }
                Some(buf)
            }
            Err(e) => {
                error!("Error reading line {}: {}", self.line_num + 1, e);
                None
            }
        }
    }

    fn eof(&self) -> Token {
        Token {
            kind: TokenKind::Eof,
            text: String::new(),
            start: self.pos,
            end: self.pos,
            line: Arc::from(""),
            line_start: self.pos,
            line_num: self.line_num + 1,
            col: 0,
        }
    }
}

impl<R: BufRead> Iterator for Lexer<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                return Some(tok);
            }
            if self.done {
                return None;
            }

            match self.read_line() {
                Some(line) => {
                    self.line_num += 1;
                    let len = line.len();
                    self.pending = tokenize_line(Arc::from(line), self.pos, self.line_num);
                    self.pos += len;
                }
                None => {
                    self.done = true;
                    return Some(self.eof());
                }
            }
        }
    }
}

/// Wraps any reader in a lexer.
pub fn tokenize<T: Read + ?Sized>(reader: Box<T>) -> Lexer<BufReader<Box<T>>> {
    Lexer::new(BufReader::new(reader))
}
