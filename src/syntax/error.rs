use thiserror::Error;

use super::lexer::Token;

/// A fatal parse error: a message plus the token(s) responsible for it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub toks: Vec<Token>,
}

impl ParseError {
    pub fn new<M: Into<String>>(message: M, toks: Vec<Token>) -> Self {
        ParseError {
            message: message.into(),
            toks,
        }
    }

    pub fn at<M: Into<String>>(message: M, tok: Token) -> Self {
        ParseError::new(message, vec![tok])
    }

    /// Renders the source line of the first offending token with a caret
    /// span under the offending text, followed by the message.
    pub fn render(&self) -> String {
        let first = match self.toks.first() {
            Some(tok) => tok,
            None => return self.message.clone(),
        };

        let end = self
            .toks
            .iter()
            .filter(|tok| tok.line_num == first.line_num)
            .map(|tok| tok.end)
            .max()
            .unwrap_or(first.end);

        // Columns on screen count characters, not bytes.
        let chars = |from: usize, to: usize| {
            first.line.get(from..to).map_or(to.saturating_sub(from), |s| s.chars().count())
        };
        let col = chars(0, first.col);
        let width = chars(first.col, end - first.line_start).max(1);

        format!(
            "at line {}, col {}:\n{}\n{}{}\n\n{}",
            first.line_num,
            col,
            first.line.trim_end(),
            " ".repeat(col),
            "^".repeat(width),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new(text.as_bytes()).collect()
    }

    #[test]
    fn test_render() {
        let expected = "at line 2, col 16:\n\
                        the quick brown fox jumped over the lazy dogs\n\
                        \x20               ^^^\n\n\
                        problem here";

        for text in &[
            "line one\nthe quick brown fox jumped over the lazy dogs",
            "line one\nthe quick brown fox jumped over the lazy dogs\n",
        ] {
            let toks = lex(text);
            let e = ParseError::at("problem here", toks[6].clone());
            assert_eq!(e.render(), expected);
        }
    }

    #[test]
    fn test_render_span_of_several_tokens() {
        let toks = lex("  add a, b\n");
        let e = ParseError::new("bad operands", toks[1..4].to_vec());
        assert_eq!(e.render(), "at line 1, col 6:\n  add a, b\n      ^^^^\n\nbad operands");
    }

    #[test]
    fn test_render_newline_and_eof() {
        let toks = lex("add a,\n");
        let e = ParseError::at("unexpected end of line", toks[3].clone());
        assert_eq!(e.render(), "at line 1, col 6:\nadd a,\n      ^\n\nunexpected end of line");

        let e = ParseError::at("expected end of file", toks[4].clone());
        assert_eq!(e.render(), "at line 2, col 0:\n\n^\n\nexpected end of file");
    }

    #[test]
    fn test_render_counts_characters() {
        let toks = lex("\u{e9} lda x\n");
        assert_eq!(toks[2].col, 7);

        let e = ParseError::at("bad", toks[2].clone());
        assert_eq!(e.render(), "at line 1, col 6:\n\u{e9} lda x\n      ^\n\nbad");

        let e = ParseError::at("bad", toks[0].clone());
        assert_eq!(e.render(), "at line 1, col 0:\n\u{e9} lda x\n^\n\nbad");
    }

    #[test]
    fn test_render_without_tokens() {
        let e = ParseError::new("unexpected end of tokens", vec![]);
        assert_eq!(e.render(), "unexpected end of tokens");
        assert_eq!(e.to_string(), "unexpected end of tokens");
    }
}
