//! Shunting-yard compiler
//!
//! Converts a token stream into a postfix (reverse-Polish) program. All
//! binary operators are treated as left-associative, `^` included -- a
//! documented simplification over mathematical right-associativity. Unary
//! operators only displace strictly stronger stack entries, so chains like
//! `--a` nest instead of clobbering each other.

use crate::error::{ExprError, ExprResult};
use crate::token::{tokenize, Token};

/// A compiled formula: tokens in postfix order, ready for the stack machine
pub type Program = Vec<Token>;

/// Compile formula text to a postfix program
pub fn compile(text: &str) -> ExprResult<Program> {
    let tokens = tokenize(text)?;
    let mut output: Program = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) | Token::Str(_) | Token::Variable(_) => output.push(token),

            Token::Function(_) => stack.push(token),

            Token::Operator(op) => {
                while let Some(Token::Operator(top)) = stack.last() {
                    let stronger = if op.is_unary() {
                        top.precedence() > op.precedence()
                    } else {
                        top.precedence() >= op.precedence()
                    };
                    if !stronger {
                        break;
                    }
                    output.push(stack.pop().ok_or_else(|| {
                        ExprError::Parse("operator stack underflow".to_string())
                    })?);
                }
                stack.push(Token::Operator(op));
            }

            Token::LParen => stack.push(Token::LParen),

            Token::RParen => {
                loop {
                    match stack.pop() {
                        Some(Token::LParen) => break,
                        Some(token) => output.push(token),
                        None => {
                            return Err(ExprError::Parse("unmatched ')'".to_string()));
                        }
                    }
                }
                // A function name sits directly under its parenthesis
                if matches!(stack.last(), Some(Token::Function(_))) {
                    output.push(stack.pop().ok_or_else(|| {
                        ExprError::Parse("operator stack underflow".to_string())
                    })?);
                }
            }

            Token::Comma => {
                // Flush the current argument back to the opening paren
                while !matches!(stack.last(), Some(Token::LParen)) {
                    match stack.pop() {
                        Some(token) => output.push(token),
                        None => {
                            return Err(ExprError::Parse(
                                "',' outside of a function call".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    while let Some(token) = stack.pop() {
        if matches!(token, Token::LParen) {
            return Err(ExprError::Parse("unmatched '('".to_string()));
        }
        output.push(token);
    }

    if output.is_empty() {
        return Err(ExprError::Parse("empty expression".to_string()));
    }

    Ok(output)
}

/// Identifiers a formula reads from its scope
///
/// Function names and dotted namespace references are filtered out;
/// duplicates are removed preserving first-seen order. The schema registry
/// turns each returned key into one dependency edge.
pub fn referenced_variables(text: &str) -> ExprResult<Vec<String>> {
    let tokens = tokenize(text)?;
    let mut variables = Vec::new();
    for token in tokens {
        if let Token::Variable(name) = token {
            if !name.contains('.') && !variables.contains(&name) {
                variables.push(name);
            }
        }
    }
    Ok(variables)
}
