//! Postfix stack machine
//!
//! Executes a compiled [`Program`] against a [`Scope`]. The coercion rules
//! are deliberately forgiving: missing or non-numeric operands act as 0,
//! division by zero yields 0, and comparisons use loose equality so a
//! numeric string equals its number. Structural faults (operand underflow,
//! an empty result) are real errors -- the engine contains them at the
//! field boundary.

use crate::compiler::Program;
use crate::error::{ExprError, ExprResult};
use crate::functions;
use crate::token::{Op, Token};
use formx_core::Value;
use std::collections::BTreeMap;

/// Flat key-to-value lookup a program evaluates against
pub trait Scope {
    /// Resolve an identifier; `None` reads as 0
    fn lookup(&self, key: &str) -> Option<Value>;
}

impl Scope for BTreeMap<String, Value> {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

/// Evaluate a postfix program
pub fn evaluate(program: &Program, scope: &dyn Scope) -> ExprResult<Value> {
    let mut stack: Vec<Value> = Vec::new();

    for token in program {
        match token {
            Token::Number(n) => stack.push(Value::Number(*n)),
            Token::Str(s) => stack.push(Value::Text(s.clone())),
            Token::Variable(name) => stack.push(resolve_variable(name, scope)),
            Token::Function(name) => functions::apply(name, &mut stack)?,
            Token::Operator(op) => apply_operator(*op, &mut stack)?,
            Token::LParen | Token::RParen | Token::Comma => {
                return Err(ExprError::Eval(format!(
                    "structural token {token:?} in compiled program"
                )));
            }
        }
    }

    stack
        .pop()
        .ok_or_else(|| ExprError::Eval("program produced no value".to_string()))
}

/// Resolve a variable token against the scope
///
/// Dotted names consult the namespace-constant table first. Missing keys,
/// nulls and non-finite numbers read as 0; text that fully parses as a
/// number reads as that number; anything else is pushed raw so strings and
/// booleans stay comparable.
fn resolve_variable(name: &str, scope: &dyn Scope) -> Value {
    if name.contains('.') {
        if let Some(constant) = functions::namespace_constant(name) {
            return Value::Number(constant);
        }
    }
    match scope.lookup(name) {
        None | Some(Value::Null) => Value::Number(0.0),
        Some(Value::Number(n)) if !n.is_finite() => Value::Number(0.0),
        Some(Value::Text(s)) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(s),
        },
        Some(value) => value,
    }
}

fn apply_operator(op: Op, stack: &mut Vec<Value>) -> ExprResult<()> {
    if op.is_unary() {
        let operand = pop(op, stack)?;
        let result = match op {
            Op::Not => Value::Bool(!operand.truthy()),
            _ => Value::Number(-operand.coerce_number()),
        };
        stack.push(result);
        return Ok(());
    }

    let right = pop(op, stack)?;
    let left = pop(op, stack)?;

    let result = match op {
        Op::Add => arith(&left, &right, |a, b| a + b),
        Op::Sub => arith(&left, &right, |a, b| a - b),
        Op::Mul => arith(&left, &right, |a, b| a * b),
        Op::Div => arith(&left, &right, |a, b| if b == 0.0 { 0.0 } else { a / b }),
        Op::Rem => arith(&left, &right, |a, b| if b == 0.0 { 0.0 } else { a % b }),
        Op::Pow => arith(&left, &right, f64::powf),
        Op::Eq => Value::Bool(left.loose_eq(&right)),
        Op::Ne => Value::Bool(!left.loose_eq(&right)),
        Op::Lt => Value::Bool(left.coerce_number() < right.coerce_number()),
        Op::Gt => Value::Bool(left.coerce_number() > right.coerce_number()),
        Op::Le => Value::Bool(left.coerce_number() <= right.coerce_number()),
        Op::Ge => Value::Bool(left.coerce_number() >= right.coerce_number()),
        Op::And => Value::Bool(left.truthy() && right.truthy()),
        Op::Or => Value::Bool(left.truthy() || right.truthy()),
        Op::Not | Op::Neg => unreachable!("unary handled above"),
    };
    stack.push(result);
    Ok(())
}

fn arith(left: &Value, right: &Value, f: fn(f64, f64) -> f64) -> Value {
    let result = f(left.coerce_number(), right.coerce_number());
    Value::Number(functions::finite_or_zero(result))
}

fn pop(op: Op, stack: &mut Vec<Value>) -> ExprResult<Value> {
    stack
        .pop()
        .ok_or_else(|| ExprError::Eval(format!("missing operand for {op:?}")))
}
