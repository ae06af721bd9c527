//! The syntax module is in charge of taking line-oriented assembly source
//! and producing a `File` AST, or a single diagnostic.
//!
//! It does this with a line-at-a-time tokenizer and a backtracking,
//! memoizing recursive descent parser that handles left-recursive
//! expression rules directly.

pub mod ast;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod stream;

pub use self::ast::{BinOp, Expr, File, Sign, Stmt, Tokens, UnOp};
pub use self::engine::ParseOptions;
pub use self::error::ParseError;
pub use self::lexer::{tokenize, Lexer, Token, TokenKind};
pub use self::parser::{parse, parse_expression, parse_str, Parser};
