//! Rule execution machinery for the parser.
//!
//! Rule bodies return a [`Step`]: either a value, or one of two signals.
//! `Backtrack` means "this rule does not match here" and is always paired
//! with a rewind of the token stream to where the enclosing optional rule
//! began. `Fatal` means the input is malformed in a way no alternative can
//! fix; it is never caught and becomes the single reported error.
//!
//! On top of that sit two caching wrappers. [`Parser::memoized`] is plain
//! packrat memoization keyed by (position, rule). [`Parser::left_recursive`]
//! additionally lets a rule call itself as its own first sub-parse by growing
//! a seed result until it stops advancing.
use std::collections::HashMap;
use std::fmt;

use super::ast::{Expr, Stmt};
use super::error::ParseError;
use super::lexer::{Token, TokenKind};
use super::parser::{Level, Parser};
use super::stream::Pos;

#[derive(Debug)]
pub(crate) enum Signal {
    Backtrack,
    Fatal(ParseError),
}

impl From<ParseError> for Signal {
    fn from(e: ParseError) -> Self {
        Signal::Fatal(e)
    }
}

pub(crate) type Step<T> = Result<T, Signal>;

/// Which signal a primitive raises when the next token does not fit.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Failure {
    Backtrack,
    Fatal,
}

impl Failure {
    /// The message is only formatted on the fatal path.
    pub(crate) fn raise<T, M: fmt::Display>(self, message: M, toks: Vec<Token>) -> Step<T> {
        match self {
            Failure::Backtrack => Err(Signal::Backtrack),
            Failure::Fatal => Err(Signal::Fatal(ParseError::new(message.to_string(), toks))),
        }
    }
}

/// Cache key tag, one per grammar rule. Rule arguments are folded into the
/// tag.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Rule {
    Offset,
    Label,
    Nullary,
    Unary,
    Binary,
    Chain(Level),
    Factor,
    Atom,
}

#[derive(Clone, Debug)]
pub(crate) enum Entry {
    Stmt(Stmt),
    Expr(Expr),
}

/// Results that can live in the memo table.
pub(crate) trait Memo: Clone + Sized {
    fn store(self) -> Entry;
    fn load(entry: Entry) -> Option<Self>;
}

impl Memo for Stmt {
    fn store(self) -> Entry {
        Entry::Stmt(self)
    }

    fn load(entry: Entry) -> Option<Self> {
        match entry {
            Entry::Stmt(stmt) => Some(stmt),
            Entry::Expr(_) => None,
        }
    }
}

impl Memo for Expr {
    fn store(self) -> Entry {
        Entry::Expr(self)
    }

    fn load(entry: Entry) -> Option<Self> {
        match entry {
            Entry::Expr(expr) => Some(expr),
            Entry::Stmt(_) => None,
        }
    }
}

/// Tunables for a single parse.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ParseOptions {
    /// Keep finished rule results. Turning this off changes performance
    /// only; seeds of in-progress left recursion are always kept.
    pub memoize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { memoize: true }
    }
}

pub(crate) struct MemoTable {
    entries: HashMap<(Pos, Rule), (Option<Entry>, Pos)>,
    pub(crate) enabled: bool,
    pub(crate) hits: usize,
}

impl MemoTable {
    pub(crate) fn new(enabled: bool) -> Self {
        MemoTable {
            entries: HashMap::new(),
            enabled,
            hits: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Runs `body`; on backtrack rewinds to where it started and yields
    /// `None`.
    pub(crate) fn optional<T, F>(&mut self, body: F) -> Result<Option<T>, ParseError>
    where
        F: FnOnce(&mut Self) -> Step<T>,
    {
        let pos = self.toks.mark();
        match body(self) {
            Ok(res) => Ok(Some(res)),
            Err(Signal::Backtrack) => {
                self.toks.reset(pos);
                Ok(None)
            }
            Err(Signal::Fatal(e)) => Err(e),
        }
    }

    fn recall<T: Memo>(&mut self, key: &(Pos, Rule)) -> Option<Option<T>> {
        let (entry, end) = self.memo.entries.get(key).cloned()?;
        self.memo.hits += 1;
        self.toks.reset(end);
        Some(entry.and_then(T::load))
    }

    pub(crate) fn memoized<T, F>(&mut self, rule: Rule, body: F) -> Result<Option<T>, ParseError>
    where
        T: Memo,
        F: FnOnce(&mut Self) -> Step<T>,
    {
        let key = (self.toks.mark(), rule);
        if let Some(res) = self.recall(&key) {
            return Ok(res);
        }

        let res = self.optional(body)?;
        if self.memo.enabled {
            let end = self.toks.mark();
            self.memo.entries.insert(key, (res.clone().map(Memo::store), end));
        }
        Ok(res)
    }

    /// Seed-growing evaluation of a rule whose body calls itself first.
    ///
    /// The table is primed with a failure at the start position, so the
    /// first run of the body falls through to its non-recursive alternative.
    /// Each later run sees the previous result as the self-call's answer and
    /// can extend it by one more operator. Stops as soon as a run fails to
    /// end strictly further than the best so far.
    pub(crate) fn left_recursive<T, F>(
        &mut self,
        rule: Rule,
        mut body: F,
    ) -> Result<Option<T>, ParseError>
    where
        T: Memo,
        F: FnMut(&mut Self) -> Step<T>,
    {
        let start = self.toks.mark();
        let key = (start, rule);
        if let Some(res) = self.recall(&key) {
            return Ok(res);
        }

        let mut best: Option<T> = None;
        let mut best_end = start;
        self.memo.entries.insert(key, (None, start));

        loop {
            self.toks.reset(start);
            let res = self.optional(&mut body)?;
            let end = self.toks.mark();
            if end <= best_end {
                break;
            }

            trace!("{:?} at {} grew to {}", rule, start, end);
            self.memo.entries.insert(key, (res.clone().map(Memo::store), end));
            best = res;
            best_end = end;
        }

        self.toks.reset(best_end);
        if !self.memo.enabled {
            self.memo.entries.remove(&key);
        }
        Ok(best)
    }

    pub(crate) fn get(&mut self, failure: Failure) -> Step<Token> {
        match self.toks.get() {
            Ok(tok) => Ok(tok),
            Err(e) => {
                let toks: Vec<Token> = self.toks.last().cloned().into_iter().collect();
                failure.raise(format_args!("unexpected {}", e), toks)
            }
        }
    }

    pub(crate) fn expect_text(&mut self, failure: Failure) -> Step<Token> {
        let tok = self.get(failure)?;
        match tok.kind {
            TokenKind::Text => Ok(tok),
            TokenKind::Newline => failure.raise("unexpected end of line", vec![tok]),
            TokenKind::Eof => failure.raise("unexpected end of file", vec![tok]),
        }
    }

    /// Expects a `Text` token whose text is one of `alts`.
    pub(crate) fn expect(&mut self, alts: &[&str], failure: Failure) -> Step<Token> {
        let tok = self.get(failure)?;
        if tok.is_text() && alts.contains(&tok.text.as_str()) {
            return Ok(tok);
        }
        if failure == Failure::Backtrack {
            return Err(Signal::Backtrack);
        }

        if alts.len() == 1 {
            failure.raise(format_args!("expected '{}'", alts[0]), vec![tok])
        } else {
            let quoted: Vec<String> = alts.iter().map(|alt| format!("'{}'", alt)).collect();
            failure.raise(format_args!("expected one of {}", quoted.join(", ")), vec![tok])
        }
    }

    pub(crate) fn expect_newline(&mut self, failure: Failure) -> Step<Token> {
        let tok = self.get(failure)?;
        if tok.is_newline() {
            Ok(tok)
        } else {
            failure.raise("expected end of line", vec![tok])
        }
    }

    pub(crate) fn maybe(&mut self, alts: &[&str]) -> Result<Option<Token>, ParseError> {
        self.optional(|p| p.expect(alts, Failure::Backtrack))
    }

    pub(crate) fn maybe_newline(&mut self) -> Result<Option<Token>, ParseError> {
        self.optional(|p| p.expect_newline(Failure::Backtrack))
    }
}
