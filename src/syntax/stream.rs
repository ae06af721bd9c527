//! A markable, rewindable view over a token iterator.
use thiserror::Error;

use super::lexer::Token;

/// Index into the token history. Positions order the same way tokens were
/// emitted.
pub type Pos = usize;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("end of tokens")]
pub struct EndOfTokens;

/// Every token pulled from the source is kept for the lifetime of the stream,
/// so a reset to any earlier mark stays valid.
pub struct TokenStream<I> {
    toks: I,
    hist: Vec<Token>,
    pos: Pos,
}

impl<I: Iterator<Item = Token>> TokenStream<I> {
    pub fn new(toks: I) -> Self {
        TokenStream {
            toks,
            hist: Vec::with_capacity(256),
            pos: 0,
        }
    }

    /// Returns the next token and advances. Replays from history after a
    /// reset, otherwise pulls from the source.
    pub fn get(&mut self) -> Result<Token, EndOfTokens> {
        if self.pos == self.hist.len() {
            let tok = self.toks.next().ok_or(EndOfTokens)?;
            self.hist.push(tok);
        }

        let tok = self.hist[self.pos].clone();
        self.pos += 1;
        Ok(tok)
    }

    /// Returns up to `n` upcoming tokens without consuming them.
    pub fn peek(&mut self, n: usize) -> Vec<Token> {
        let pos = self.mark();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.get() {
                Ok(tok) => out.push(tok),
                Err(_) => break,
            }
        }
        self.reset(pos);
        out
    }

    #[inline]
    pub fn mark(&self) -> Pos {
        self.pos
    }

    #[inline]
    pub fn reset(&mut self, pos: Pos) {
        debug_assert!(pos <= self.hist.len());
        self.pos = pos;
    }

    /// The most recently produced token, if any.
    pub fn last(&self) -> Option<&Token> {
        self.hist.last()
    }

    /// Number of tokens pulled from the source so far.
    pub fn produced(&self) -> usize {
        self.hist.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn stream(text: &str) -> TokenStream<Lexer<&[u8]>> {
        TokenStream::new(Lexer::new(text.as_bytes()))
    }

    #[test]
    fn test_get_and_reset() {
        let mut toks = stream("lda 1\nout\n");
        let start = toks.mark();
        assert_eq!(toks.get().unwrap().text, "lda");
        assert_eq!(toks.get().unwrap().text, "1");
        let mid = toks.mark();
        assert!(toks.get().unwrap().is_newline());
        assert_eq!(toks.get().unwrap().text, "out");

        toks.reset(mid);
        assert!(toks.get().unwrap().is_newline());

        toks.reset(start);
        assert_eq!(toks.get().unwrap().text, "lda");
        assert_eq!(toks.produced(), 4);
    }

    #[test]
    fn test_get_past_eof() {
        let mut toks = stream("");
        assert!(toks.get().unwrap().is_eof());
        assert_eq!(toks.get(), Err(EndOfTokens));
        assert!(toks.last().unwrap().is_eof());

        // Eof stays readable after a rewind.
        toks.reset(0);
        assert!(toks.get().unwrap().is_eof());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut toks = stream("add a, b\n");
        let peeked: Vec<String> = toks.peek(3).into_iter().map(|t| t.text).collect();
        assert_eq!(peeked, vec!["add", "a", ","]);
        assert_eq!(toks.mark(), 0);
        assert_eq!(toks.get().unwrap().text, "add");

        // Peeking beyond the end stops at Eof.
        assert_eq!(toks.peek(100).len(), 5);
    }
}
