//! The Parser module takes a token stream from the lexer and converts it
//! into an AST.
//!
//! Statements are tried in order (offset, label, instruction) and the first
//! match wins. Binary operator levels are all built by one left-recursive
//! rule, [`Parser::chain`], parameterized by a [`Level`].
use std::io::BufRead;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::*;
use super::engine::{Failure, MemoTable, ParseOptions, Rule, Signal, Step};
use super::error::ParseError;
use super::lexer::{Lexer, Token};
use super::stream::TokenStream;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());
/// Underscores may only separate digits.
static INT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(0b[01](_?[01])*|0o[0-7](_?[0-7])*",
        r"|0x[0-9a-fA-F](_?[0-9a-fA-F])*|[0-9](_?[0-9])*)$"
    ))
    .unwrap()
});

fn is_name(text: &str) -> bool {
    NAME_RE.is_match(text)
}

/// Value of an integer literal token, `None` if the token does not have
/// integer form. A literal that does not fit in 64 bits is an error.
fn int_value(tok: &Token) -> Result<Option<u64>, ParseError> {
    if !INT_RE.is_match(&tok.text) {
        return Ok(None);
    }

    let (digits, radix) = match tok.text.get(..2) {
        Some("0b") => (&tok.text[2..], 2),
        Some("0o") => (&tok.text[2..], 8),
        Some("0x") => (&tok.text[2..], 16),
        _ => (tok.text.as_str(), 10),
    };
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    match u64::from_str_radix(&digits, radix) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(ParseError::at(
            format!("integer literal '{}' does not fit in 64 bits", tok.text),
            tok.clone(),
        )),
    }
}

/// Deepest allowed nesting of parentheses and prefix operators.
pub const MAX_NESTING: usize = 64;

fn check_mnemonic(tok: &Token) -> Result<(), ParseError> {
    if is_name(&tok.text) {
        Ok(())
    } else {
        Err(ParseError::at(format!("'{}' is not a valid name", tok.text), tok.clone()))
    }
}

/// Binary operator precedence levels, loosest first.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Level {
    BitOr,
    BitXor,
    BitAnd,
    Shift,
    Sum,
    Term,
    Power,
}

/// What sits on either side of a level's operators.
#[derive(Copy, Clone, Debug)]
enum Operand {
    Chain(Level),
    Factor,
    Atom,
}

impl Level {
    fn operators(self) -> &'static [BinOp] {
        use BinOp::*;
        match self {
            Level::BitOr => &[Or],
            Level::BitXor => &[Xor],
            Level::BitAnd => &[And],
            Level::Shift => &[Shl, Shr],
            Level::Sum => &[Add, Sub],
            Level::Term => &[Mul, Div, Rem],
            Level::Power => &[Pow],
        }
    }

    fn operand(self) -> Operand {
        match self {
            Level::BitOr => Operand::Chain(Level::BitXor),
            Level::BitXor => Operand::Chain(Level::BitAnd),
            Level::BitAnd => Operand::Chain(Level::Shift),
            Level::Shift => Operand::Chain(Level::Sum),
            Level::Sum => Operand::Chain(Level::Term),
            Level::Term => Operand::Factor,
            Level::Power => Operand::Atom,
        }
    }
}

pub struct Parser<I: Iterator<Item = Token>> {
    pub(crate) toks: TokenStream<I>,
    pub(crate) memo: MemoTable,
    depth: usize,
}

impl<'a> Parser<Lexer<&'a [u8]>> {
    pub fn from_text(text: &'a str, options: ParseOptions) -> Self {
        Parser::with_options(Lexer::new(text.as_bytes()), options)
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Parser::with_options(tokens, ParseOptions::default())
    }

    pub fn with_options(tokens: I, options: ParseOptions) -> Self {
        Parser {
            toks: TokenStream::new(tokens),
            memo: MemoTable::new(options.memoize),
            depth: 0,
        }
    }

    /// Parses statements until none matches, then requires end of file.
    pub fn parse_file(&mut self) -> Result<File, ParseError> {
        let mut stmts = Vec::new();
        while let Some(stmt) = self.stmt()? {
            stmts.push(stmt);
        }
        self.eof()?;

        debug!(
            "parsed {} statement(s) from {} token(s); {} memo entries, {} hits",
            stmts.len(),
            self.toks.produced(),
            self.memo.len(),
            self.memo.hits
        );
        Ok(File { stmts })
    }

    /// Parses one expression at the current position.
    pub fn parse_expr(&mut self) -> Result<Option<Expr>, ParseError> {
        self.chain(Level::BitOr)
    }

    fn eof(&mut self) -> Result<(), ParseError> {
        match self.toks.get() {
            Ok(ref tok) if tok.is_eof() => Ok(()),
            Ok(tok) => Err(ParseError::at("expected end of file", tok)),
            Err(e) => Err(ParseError::new(
                format!("unexpected {}", e),
                self.toks.last().cloned().into_iter().collect(),
            )),
        }
    }

    fn stmt(&mut self) -> Result<Option<Stmt>, ParseError> {
        if let Some(stmt) = self.offset()? {
            return Ok(Some(stmt));
        }
        if let Some(stmt) = self.label()? {
            return Ok(Some(stmt));
        }
        self.instruction()
    }

    fn offset(&mut self) -> Result<Option<Stmt>, ParseError> {
        self.memoized(Rule::Offset, |p| {
            let sign_tok = p.maybe(&["+", "-"])?;
            let val = p.expect_text(Failure::Backtrack)?;
            let colon = p.expect(&[":"], Failure::Backtrack)?;
            let value = match int_value(&val)? {
                Some(value) => value,
                None => return Err(Signal::Backtrack),
            };

            let mut toks = Tokens::new();
            let sign = sign_tok.and_then(|tok| {
                let sign = Sign::from_symbol(&tok.text);
                toks.push(tok);
                sign
            });
            toks.push(val);
            toks.push(colon);
            if let Some(nl) = p.maybe_newline()? {
                toks.push(nl);
            }

            Ok(Stmt::Offset { value, sign, toks })
        })
    }

    fn label(&mut self) -> Result<Option<Stmt>, ParseError> {
        self.memoized(Rule::Label, |p| {
            let name = p.expect_text(Failure::Backtrack)?;
            let colon = p.expect(&[":"], Failure::Backtrack)?;
            if !is_name(&name.text) {
                return Err(Signal::Backtrack);
            }

            let name_text = name.text.clone();
            let mut toks = Tokens::from(vec![name, colon]);
            if let Some(nl) = p.maybe_newline()? {
                toks.push(nl);
            }

            Ok(Stmt::Label {
                name: name_text,
                toks,
            })
        })
    }

    fn instruction(&mut self) -> Result<Option<Stmt>, ParseError> {
        if let Some(stmt) = self.nullary()? {
            return Ok(Some(stmt));
        }
        if let Some(stmt) = self.unary()? {
            return Ok(Some(stmt));
        }
        self.binary()
    }

    /// A bare mnemonic or a bare integer on a line of its own.
    fn nullary(&mut self) -> Result<Option<Stmt>, ParseError> {
        self.memoized(Rule::Nullary, |p| {
            let tok = p.expect_text(Failure::Backtrack)?;
            let nl = p.expect_newline(Failure::Backtrack)?;

            if is_name(&tok.text) {
                return Ok(Stmt::Op {
                    mnemonic: tok.text.clone(),
                    args: Vec::new(),
                    toks: Tokens::from(vec![tok, nl]),
                });
            }
            if let Some(value) = int_value(&tok)? {
                return Ok(Stmt::Val {
                    value,
                    toks: Tokens::from(vec![tok, nl]),
                });
            }

            let message = format!("'{}' is not a valid name or integer", tok.text);
            Err(ParseError::at(message, tok).into())
        })
    }

    fn unary(&mut self) -> Result<Option<Stmt>, ParseError> {
        self.memoized(Rule::Unary, |p| {
            let mnemonic = p.expect_text(Failure::Backtrack)?;
            let arg = match p.parse_expr()? {
                Some(arg) => arg,
                None => return Err(Signal::Backtrack),
            };
            let nl = p.expect_newline(Failure::Backtrack)?;
            check_mnemonic(&mnemonic)?;

            let name = mnemonic.text.clone();
            let mut toks = Tokens::from(vec![mnemonic]);
            toks.extend_from(arg.toks());
            toks.push(nl);

            Ok(Stmt::Op {
                mnemonic: name,
                args: vec![arg],
                toks,
            })
        })
    }

    /// Once the mnemonic is read the statement can only be binary, so every
    /// later mismatch is fatal.
    fn binary(&mut self) -> Result<Option<Stmt>, ParseError> {
        self.memoized(Rule::Binary, |p| {
            let mnemonic = p.expect_text(Failure::Backtrack)?;
            let first = p.argument()?;
            let comma = p.expect(&[","], Failure::Fatal)?;
            let second = p.argument()?;
            let nl = p.expect_newline(Failure::Fatal)?;
            check_mnemonic(&mnemonic)?;

            let name = mnemonic.text.clone();
            let mut toks = Tokens::from(vec![mnemonic]);
            toks.extend_from(first.toks());
            toks.push(comma);
            toks.extend_from(second.toks());
            toks.push(nl);

            Ok(Stmt::Op {
                mnemonic: name,
                args: vec![first, second],
                toks,
            })
        })
    }

    /// A mandatory instruction argument.
    fn argument(&mut self) -> Result<Expr, ParseError> {
        if let Some(expr) = self.parse_expr()? {
            return Ok(expr);
        }

        match self.toks.peek(1).pop() {
            Some(tok) if tok.is_text() => {
                let message = format!("'{}' is not a valid name or integer", tok.text);
                Err(ParseError::at(message, tok))
            }
            Some(tok) => Err(ParseError::at(format!("unexpected {}", tok), tok)),
            None => Err(ParseError::new("unexpected end of tokens", Vec::new())),
        }
    }

    fn operand(&mut self, operand: Operand) -> Result<Option<Expr>, ParseError> {
        match operand {
            Operand::Chain(level) => self.chain(level),
            Operand::Factor => self.factor(),
            Operand::Atom => self.atom(),
        }
    }

    /// `chain := chain OP operand | operand`, for the operators of `level`.
    pub(crate) fn chain(&mut self, level: Level) -> Result<Option<Expr>, ParseError> {
        self.left_recursive(Rule::Chain(level), move |p| {
            if let Some(left) = p.chain(level)? {
                let op_tok = p.expect_text(Failure::Backtrack)?;
                let op = match BinOp::from_symbol(&op_tok.text) {
                    Some(op) if level.operators().contains(&op) => op,
                    _ => return Err(Signal::Backtrack),
                };
                let right = match p.operand(level.operand())? {
                    Some(right) => right,
                    None => {
                        let message = format!("expected expression after '{}' operator", op);
                        return Err(ParseError::at(message, op_tok).into());
                    }
                };

                let mut toks = left.toks().clone();
                toks.push(op_tok);
                toks.extend_from(right.toks());
                return Ok(Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                    toks,
                });
            }

            p.operand(level.operand())?.ok_or(Signal::Backtrack)
        })
    }

    /// Prefix `-` and `~`, binding looser than `**`.
    pub(crate) fn factor(&mut self) -> Result<Option<Expr>, ParseError> {
        self.memoized(Rule::Factor, |p| {
            if let Some(op_tok) = p.maybe(&["-", "~"])? {
                let op = match UnOp::from_symbol(&op_tok.text) {
                    Some(op) => op,
                    None => return Err(Signal::Backtrack),
                };
                let operand = match p.nested(&op_tok, |p| Ok(p.factor()?))? {
                    Some(operand) => operand,
                    None => {
                        let message =
                            format!("expected expression after '{}' operator", op.symbol());
                        return Err(ParseError::at(message, op_tok).into());
                    }
                };

                let mut toks = Tokens::from(vec![op_tok]);
                toks.extend_from(operand.toks());
                return Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    toks,
                });
            }

            p.chain(Level::Power)?.ok_or(Signal::Backtrack)
        })
    }

    pub(crate) fn atom(&mut self) -> Result<Option<Expr>, ParseError> {
        self.memoized(Rule::Atom, |p| {
            if let Some(l_paren) = p.maybe(&["("])? {
                let mut inner = match p.nested(&l_paren, |p| Ok(p.parse_expr()?))? {
                    Some(inner) => inner,
                    None => {
                        let message = format!("expected expression after '{}'", l_paren.text);
                        return Err(ParseError::at(message, l_paren).into());
                    }
                };
                let r_paren = p.expect(&[")"], Failure::Fatal)?;

                let mut toks = Tokens::from(vec![l_paren]);
                toks.extend_from(inner.toks());
                toks.push(r_paren);
                *inner.toks_mut() = toks;
                return Ok(inner);
            }

            let tok = p.expect_text(Failure::Backtrack)?;
            if let Some(value) = int_value(&tok)? {
                return Ok(Expr::Val {
                    value,
                    toks: Tokens::from(vec![tok]),
                });
            }
            if is_name(&tok.text) {
                return Ok(Expr::Name {
                    name: tok.text.clone(),
                    toks: Tokens::from(vec![tok]),
                });
            }
            Err(Signal::Backtrack)
        })
    }

    /// Runs `body` one nesting level deeper, failing at `open` once the
    /// limit is reached.
    fn nested<T, F>(&mut self, open: &Token, body: F) -> Step<T>
    where
        F: FnOnce(&mut Self) -> Step<T>,
    {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::at("expression nested too deeply", open.clone()).into());
        }

        self.depth += 1;
        let res = body(self);
        self.depth -= 1;
        res
    }

    /// Requires the end of the current line followed by end of file.
    fn finish_expr(&mut self) -> Result<(), ParseError> {
        self.optional(|p| p.expect_newline(Failure::Fatal))?;
        self.eof()
    }
}

/// Parses a whole file from any buffered reader.
pub fn parse<R: BufRead>(reader: R, options: ParseOptions) -> Result<File, ParseError> {
    Parser::with_options(Lexer::new(reader), options).parse_file()
}

pub fn parse_str(text: &str) -> Result<File, ParseError> {
    Parser::from_text(text, ParseOptions::default()).parse_file()
}

/// Parses `text` as a single expression spanning the whole input.
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::from_text(text, ParseOptions::default());
    let expr = match parser.parse_expr()? {
        Some(expr) => expr,
        None => {
            let toks = parser.toks.peek(1);
            return Err(ParseError::new("expected expression", toks));
        }
    };
    parser.finish_expr()?;
    Ok(expr)
}
