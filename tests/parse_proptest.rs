//! Property-based tests for the tokenizer and the parser.

use packasm::syntax::{parse_expression, Lexer, ParseOptions, Parser, Token};
use proptest::prelude::*;

/// A source line: code-ish characters, optionally followed by a comment.
fn line_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_ \t+*<>:,()~-]{0,16}(;[ a-z]{0,8}|#[ a-z]{0,8})?"
}

fn expected_content(line: &str) -> String {
    let code = match line.find(|c| c == ';' || c == '#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

fn leaf_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[a-z][a-z0-9_]{0,3}", "[0-9]{1,4}", "0x[0-9a-f]{1,4}"]
}

fn op_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["|", "^", "&", "<<", ">>", "+", "-", "*", "/", "%", "**"])
}

fn expr_strategy() -> impl Strategy<Value = String> {
    leaf_strategy().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), op_strategy(), inner.clone())
                .prop_map(|(x, op, y)| format!("{} {} {}", x, op, y)),
            inner.clone().prop_map(|x| format!("({})", x)),
            inner.clone().prop_map(|x| format!("-{}", x)),
            inner.prop_map(|x| format!("~{}", x)),
        ]
    })
}

fn lex(text: &str) -> Vec<Token> {
    Lexer::new(text.as_bytes()).collect()
}

proptest! {
    #[test]
    fn tokens_reconstruct_content(lines in prop::collection::vec(line_strategy(), 0..8)) {
        let text = lines.join("\n");
        let toks = lex(&text);

        for (idx, line) in lines.iter().enumerate() {
            let line_num = idx + 1;
            let on_line: Vec<&Token> = toks
                .iter()
                .filter(|t| t.line_num == line_num && !t.is_eof())
                .collect();
            let content: String = on_line
                .iter()
                .filter(|t| t.is_text())
                .map(|t| t.text.as_str())
                .collect();
            let expected = expected_content(line);

            prop_assert_eq!(&content, &expected);
            let newlines = on_line.iter().filter(|t| t.is_newline()).count();
            prop_assert_eq!(newlines, if expected.is_empty() { 0 } else { 1 });
        }
        prop_assert!(toks.last().map_or(false, |t| t.is_eof()));
    }

    #[test]
    fn token_positions_are_consistent(lines in prop::collection::vec(line_strategy(), 0..8)) {
        let text = lines.join("\n");
        let toks = lex(&text);

        let mut last = 0;
        for tok in &toks {
            prop_assert!(tok.start >= last);
            prop_assert!(tok.end >= tok.start);
            last = tok.start;
            if !tok.is_eof() {
                prop_assert_eq!(tok.start, tok.line_start + tok.col);
                prop_assert_eq!(&tok.line[tok.col..tok.col + tok.text.len()], tok.text.as_str());
            }
        }
    }

    #[test]
    fn memoization_is_transparent(a in expr_strategy(), b in expr_strategy()) {
        let text = format!("start:\n  lda {}\n  add {}, {}\n  out\n", a, a, b);
        let memo = Parser::from_text(&text, ParseOptions { memoize: true }).parse_file();
        let plain = Parser::from_text(&text, ParseOptions { memoize: false }).parse_file();
        prop_assert_eq!(memo, plain);
    }

    #[test]
    fn printed_expression_reparses_to_same_tree(text in expr_strategy()) {
        // `x ** -y` and friends are rightly rejected.
        let parsed = parse_expression(&text);
        prop_assume!(parsed.is_ok());
        let expr = parsed.unwrap();
        let printed = expr.to_string();
        prop_assert_eq!(parse_expression(&printed).unwrap(), expr);
    }
}
