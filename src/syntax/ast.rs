//! This AST describes a parsed source file.
//!
//! A file is a flat list of statements, one per line. Comments are prefixed
//! with `;` or `#` and are single-line only.
//!
//! ```nasm
//! start:            ; label
//!   lda init        ; unary instruction
//!   add a, b*2      ; binary instruction, arguments may be expressions
//!   out             ; nullary instruction
//!   jmp start
//!
//! 0x80:             ; absolute offset
//! init: 42          ; label followed by a bare data word
//! +4: hlt           ; relative offset
//! ```
//!
//! Expressions support, loosest to tightest: `|`, `^`, `&`, `<< >>`,
//! `+ -`, `* / %`, unary `-` and `~`, `**`, and parentheses.
//!
//! Every node keeps the tokens it was built from. They only serve
//! diagnostics and never take part in equality.
use std::fmt;
use std::ops::Deref;

use super::lexer::Token;

/// The tokens a node was parsed from. Always compares equal, so node
/// equality is purely structural.
#[derive(Clone, Debug, Default)]
pub struct Tokens(Vec<Token>);

impl Tokens {
    pub fn new() -> Self {
        Tokens(Vec::new())
    }

    pub fn push(&mut self, tok: Token) {
        self.0.push(tok);
    }

    pub fn extend_from(&mut self, other: &Tokens) {
        self.0.extend_from_slice(&other.0);
    }
}

impl PartialEq for Tokens {
    fn eq(&self, _other: &Tokens) -> bool {
        true
    }
}

impl Eq for Tokens {}

impl Deref for Tokens {
    type Target = [Token];

    fn deref(&self) -> &[Token] {
        &self.0
    }
}

impl From<Vec<Token>> for Tokens {
    fn from(toks: Vec<Token>) -> Self {
        Tokens(toks)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct File {
    pub stmts: Vec<Stmt>,
}

impl File {
    /// All tokens of all statements, in source order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.stmts.iter().flat_map(|stmt| stmt.toks().iter())
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for stmt in &self.stmts {
            writeln!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn from_symbol(symbol: &str) -> Option<Sign> {
        match symbol {
            "+" => Some(Sign::Plus),
            "-" => Some(Sign::Minus),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Stmt {
    Label {
        name: String,
        toks: Tokens,
    },
    /// Fixes the address of what follows. Without a sign the offset is
    /// absolute, otherwise relative to the current address.
    Offset {
        value: u64,
        sign: Option<Sign>,
        toks: Tokens,
    },
    Op {
        mnemonic: String,
        args: Vec<Expr>,
        toks: Tokens,
    },
    /// A bare data word.
    Val {
        value: u64,
        toks: Tokens,
    },
}

impl Stmt {
    pub fn label(name: &str) -> Stmt {
        Stmt::Label {
            name: name.to_owned(),
            toks: Tokens::new(),
        }
    }

    pub fn offset(value: u64, sign: Option<Sign>) -> Stmt {
        Stmt::Offset {
            value,
            sign,
            toks: Tokens::new(),
        }
    }

    pub fn op(mnemonic: &str, args: Vec<Expr>) -> Stmt {
        Stmt::Op {
            mnemonic: mnemonic.to_owned(),
            args,
            toks: Tokens::new(),
        }
    }

    pub fn val(value: u64) -> Stmt {
        Stmt::Val {
            value,
            toks: Tokens::new(),
        }
    }

    pub fn toks(&self) -> &Tokens {
        match self {
            Stmt::Label { toks, .. }
            | Stmt::Offset { toks, .. }
            | Stmt::Op { toks, .. }
            | Stmt::Val { toks, .. } => toks,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Label { name, .. } => write!(f, "{}:", name),
            Stmt::Offset { value, sign, .. } => {
                write!(f, "{}{}:", sign.map_or("", Sign::symbol), value)
            }
            Stmt::Op { mnemonic, args, .. } => {
                write!(f, "{}", mnemonic)?;
                for (idx, arg) in args.iter().enumerate() {
                    let sep = if idx == 0 { " " } else { ", " };
                    write!(f, "{}{}", sep, arg)?;
                }
                Ok(())
            }
            Stmt::Val { value, .. } => write!(f, "{}", value),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn from_symbol(symbol: &str) -> Option<UnOp> {
        match symbol {
            "-" => Some(UnOp::Neg),
            "~" => Some(UnOp::Not),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "~",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BinOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinOp {
    pub fn from_symbol(symbol: &str) -> Option<BinOp> {
        use BinOp::*;
        match symbol {
            "|" => Some(Or),
            "^" => Some(Xor),
            "&" => Some(And),
            "<<" => Some(Shl),
            ">>" => Some(Shr),
            "+" => Some(Add),
            "-" => Some(Sub),
            "*" => Some(Mul),
            "/" => Some(Div),
            "%" => Some(Rem),
            "**" => Some(Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        use BinOp::*;
        match self {
            Or => "|",
            Xor => "^",
            And => "&",
            Shl => "<<",
            Shr => ">>",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Rem => "%",
            Pow => "**",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Expr {
    Name {
        name: String,
        toks: Tokens,
    },
    Val {
        value: u64,
        toks: Tokens,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        toks: Tokens,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        toks: Tokens,
    },
}

impl Expr {
    pub fn name(name: &str) -> Expr {
        Expr::Name {
            name: name.to_owned(),
            toks: Tokens::new(),
        }
    }

    pub fn val(value: u64) -> Expr {
        Expr::Val {
            value,
            toks: Tokens::new(),
        }
    }

    pub fn unary(op: UnOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
            toks: Tokens::new(),
        }
    }

    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
            toks: Tokens::new(),
        }
    }

    pub fn toks(&self) -> &Tokens {
        match self {
            Expr::Name { toks, .. }
            | Expr::Val { toks, .. }
            | Expr::Unary { toks, .. }
            | Expr::Binary { toks, .. } => toks,
        }
    }

    pub fn toks_mut(&mut self) -> &mut Tokens {
        match self {
            Expr::Name { toks, .. }
            | Expr::Val { toks, .. }
            | Expr::Unary { toks, .. }
            | Expr::Binary { toks, .. } => toks,
        }
    }
}

/// Binary expressions print fully parenthesized so the tree shape is visible.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Name { name, .. } => write!(f, "{}", name),
            Expr::Val { value, .. } => write!(f, "{}", value),
            Expr::Unary { op, operand, .. } => write!(f, "{}{}", op.symbol(), operand),
            Expr::Binary { left, op, right, .. } => {
                f.write_str("(")?;
                write_operand(f, left, *op)?;
                write!(f, " {} ", op)?;
                write_operand(f, right, *op)?;
                f.write_str(")")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter, expr: &Expr, op: BinOp) -> fmt::Result {
    match expr {
        // `**` binds tighter than the prefix operators.
        Expr::Unary { .. } if op == BinOp::Pow => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    #[test]
    fn test_equality_ignores_tokens() {
        let toks: Vec<Token> = Lexer::new("foo\n".as_bytes()).collect();
        let with_toks = Expr::Name {
            name: "foo".to_owned(),
            toks: Tokens::from(toks),
        };
        assert_eq!(with_toks, Expr::name("foo"));
        assert_ne!(with_toks, Expr::name("bar"));
        assert_ne!(Expr::val(1), Expr::name("1"));
    }

    #[test]
    fn test_operator_symbols() {
        for sym in &["|", "^", "&", "<<", ">>", "+", "-", "*", "/", "%", "**"] {
            assert_eq!(BinOp::from_symbol(sym).map(BinOp::symbol), Some(*sym));
        }
        assert_eq!(BinOp::from_symbol("<>"), None);
        assert_eq!(UnOp::from_symbol("~"), Some(UnOp::Not));
        assert_eq!(Sign::from_symbol("*"), None);
    }

    #[test]
    fn test_display() {
        let stmt = Stmt::op(
            "add",
            vec![
                Expr::name("a"),
                Expr::binary(Expr::name("b"), BinOp::Mul, Expr::unary(UnOp::Neg, Expr::val(2))),
            ],
        );
        assert_eq!(stmt.to_string(), "add a, (b * -2)");
        assert_eq!(Stmt::offset(3, Some(Sign::Plus)).to_string(), "+3:");
        assert_eq!(Stmt::offset(16, None).to_string(), "16:");
        assert_eq!(Stmt::label("loop").to_string(), "loop:");
        assert_eq!(Stmt::op("out", vec![]).to_string(), "out");
        assert_eq!(Stmt::val(42).to_string(), "42");

        let pow = Expr::binary(Expr::unary(UnOp::Neg, Expr::name("a")), BinOp::Pow, Expr::val(2));
        assert_eq!(pow.to_string(), "((-a) ** 2)");
        assert_eq!(Expr::unary(UnOp::Neg, pow).to_string(), "-((-a) ** 2)");
    }
}
