//! Formula tokenizer
//!
//! Produces the token stream consumed by the shunting-yard compiler.
//! Identifiers are classified as functions when the next non-whitespace
//! character is `(`; `-` is unary when it opens the expression or follows
//! an operator, `(` or `,`.

use crate::error::{ExprError, ExprResult};

/// Operators, binary unless noted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    /// Unary logical not
    Not,
    /// Unary minus
    Neg,
}

impl Op {
    /// Binding strength, low to high
    pub fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Eq | Op::Ne => 3,
            Op::Lt | Op::Gt | Op::Le | Op::Ge => 4,
            Op::Add | Op::Sub => 5,
            Op::Mul | Op::Div | Op::Rem => 6,
            Op::Pow => 7,
            Op::Not => 8,
            Op::Neg => 9,
        }
    }

    /// Whether the operator takes a single operand
    pub fn is_unary(self) -> bool {
        matches!(self, Op::Not | Op::Neg)
    }
}

/// One token of a formula
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Decimal number literal
    Number(f64),
    /// Quoted string literal (no escape processing)
    Str(String),
    /// Identifier resolved against the evaluation scope
    Variable(String),
    /// Identifier immediately followed by `(`
    Function(String),
    Operator(Op),
    LParen,
    RParen,
    Comma,
}

/// Tokenize formula text
pub fn tokenize(text: &str) -> ExprResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Number literal
        if c.is_ascii_digit() || (c == '.' && peek_digit(&chars, pos + 1)) {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < chars.len() && chars[pos] == '.' {
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            let literal: String = chars[start..pos].iter().collect();
            let number = literal
                .parse::<f64>()
                .map_err(|_| ExprError::Parse(format!("invalid number literal '{literal}'")))?;
            tokens.push(Token::Number(number));
            continue;
        }

        // String literal, single or double quoted
        if c == '"' || c == '\'' {
            let quote = c;
            let start = pos;
            pos += 1;
            let mut literal = String::new();
            while pos < chars.len() && chars[pos] != quote {
                literal.push(chars[pos]);
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(ExprError::Parse(format!(
                    "unterminated string literal at position {start}"
                )));
            }
            pos += 1; // closing quote
            tokens.push(Token::Str(literal));
            continue;
        }

        // Identifier: variable, function name, or dotted namespace reference
        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_' || chars[pos] == '.')
            {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            if next_significant(&chars, pos) == Some('(') {
                tokens.push(Token::Function(name));
            } else {
                tokens.push(Token::Variable(name));
            }
            continue;
        }

        // Operators and punctuation
        let two: Option<&str> = if pos + 1 < chars.len() {
            Some(match (c, chars[pos + 1]) {
                ('|', '|') => "||",
                ('&', '&') => "&&",
                ('=', '=') => "==",
                ('!', '=') => "!=",
                ('<', '=') => "<=",
                ('>', '=') => ">=",
                _ => "",
            })
        } else {
            None
        };

        if let Some(symbol) = two.filter(|s| !s.is_empty()) {
            let op = match symbol {
                "||" => Op::Or,
                "&&" => Op::And,
                "==" => Op::Eq,
                "!=" => Op::Ne,
                "<=" => Op::Le,
                ">=" => Op::Ge,
                _ => unreachable!(),
            };
            tokens.push(Token::Operator(op));
            pos += 2;
            continue;
        }

        let token = match c {
            '<' => Token::Operator(Op::Lt),
            '>' => Token::Operator(Op::Gt),
            '+' => Token::Operator(Op::Add),
            '-' => {
                if unary_minus_position(tokens.last()) {
                    Token::Operator(Op::Neg)
                } else {
                    Token::Operator(Op::Sub)
                }
            }
            '*' => Token::Operator(Op::Mul),
            '/' => Token::Operator(Op::Div),
            '%' => Token::Operator(Op::Rem),
            '^' => Token::Operator(Op::Pow),
            '!' => Token::Operator(Op::Not),
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            _ => {
                return Err(ExprError::Tokenize {
                    position: pos,
                    character: c,
                })
            }
        };
        tokens.push(token);
        pos += 1;
    }

    Ok(tokens)
}

/// `-` is unary at the start of the expression and after an operator,
/// `(` or `,`
fn unary_minus_position(previous: Option<&Token>) -> bool {
    matches!(
        previous,
        None | Some(Token::Operator(_)) | Some(Token::LParen) | Some(Token::Comma)
    )
}

fn peek_digit(chars: &[char], pos: usize) -> bool {
    chars.get(pos).map_or(false, char::is_ascii_digit)
}

fn next_significant(chars: &[char], mut pos: usize) -> Option<char> {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    chars.get(pos).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_arithmetic() {
        let tokens = tokenize("a + b * 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Variable("a".into()),
                Token::Operator(Op::Add),
                Token::Variable("b".into()),
                Token::Operator(Op::Mul),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_function_vs_variable() {
        let tokens = tokenize("MAX(a, b)").unwrap();
        assert_eq!(tokens[0], Token::Function("MAX".into()));

        // Whitespace before the paren still makes a function
        let tokens = tokenize("MAX (a, b)").unwrap();
        assert_eq!(tokens[0], Token::Function("MAX".into()));

        let tokens = tokenize("MAX + 1").unwrap();
        assert_eq!(tokens[0], Token::Variable("MAX".into()));
    }

    #[test]
    fn test_tokenize_dotted_identifier() {
        let tokens = tokenize("Math.pow(a, 2) + Math.PI").unwrap();
        assert_eq!(tokens[0], Token::Function("Math.pow".into()));
        assert_eq!(tokens.last(), Some(&Token::Variable("Math.PI".into())));
    }

    #[test]
    fn test_tokenize_unary_minus() {
        let tokens = tokenize("-a").unwrap();
        assert_eq!(tokens[0], Token::Operator(Op::Neg));

        let tokens = tokenize("a - b").unwrap();
        assert_eq!(tokens[1], Token::Operator(Op::Sub));

        let tokens = tokenize("a * -1").unwrap();
        assert_eq!(tokens[2], Token::Operator(Op::Neg));

        let tokens = tokenize("(-a)").unwrap();
        assert_eq!(tokens[1], Token::Operator(Op::Neg));

        let tokens = tokenize("MAX(a, -b)").unwrap();
        assert_eq!(tokens[4], Token::Operator(Op::Neg));
    }

    #[test]
    fn test_tokenize_strings() {
        let tokens = tokenize(r#"IF(x, "yes", 'no')"#).unwrap();
        assert!(tokens.contains(&Token::Str("yes".into())));
        assert!(tokens.contains(&Token::Str("no".into())));

        assert!(tokenize(r#""open"#).is_err());
    }

    #[test]
    fn test_tokenize_two_char_operators() {
        let tokens = tokenize("a >= b && c != d || !e").unwrap();
        assert!(tokens.contains(&Token::Operator(Op::Ge)));
        assert!(tokens.contains(&Token::Operator(Op::And)));
        assert!(tokens.contains(&Token::Operator(Op::Ne)));
        assert!(tokens.contains(&Token::Operator(Op::Or)));
        assert!(tokens.contains(&Token::Operator(Op::Not)));
    }

    #[test]
    fn test_tokenize_rejects_unknown() {
        match tokenize("a @ b") {
            Err(ExprError::Tokenize { character: '@', .. }) => {}
            other => panic!("expected tokenize error, got {other:?}"),
        }
    }

    #[test]
    fn test_tokenize_decimals() {
        let tokens = tokenize("1.5 + .25").unwrap();
        assert_eq!(tokens[0], Token::Number(1.5));
        assert_eq!(tokens[2], Token::Number(0.25));
    }
}
