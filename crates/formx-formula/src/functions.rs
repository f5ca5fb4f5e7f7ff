//! Builtin function table
//!
//! Fixed-arity reducers dispatched by normalized name: any dotted
//! namespace prefix is stripped and the remainder uppercased, so
//! `Math.pow`, `pow` and `POW` all hit the same entry. An unrecognized
//! function logs a diagnostic and yields 0 instead of failing the field.

use crate::error::{ExprError, ExprResult};
use formx_core::Value;

/// Namespaced constants resolvable as variables (e.g. `Math.PI`)
pub fn namespace_constant(name: &str) -> Option<f64> {
    match normalize(name).as_str() {
        "PI" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        _ => None,
    }
}

/// Apply one builtin to the evaluation stack
pub fn apply(name: &str, stack: &mut Vec<Value>) -> ExprResult<()> {
    match normalize(name).as_str() {
        "MAX" => binary_number(name, stack, f64::max),
        "MIN" => binary_number(name, stack, f64::min),
        "POW" => binary_number(name, stack, f64::powf),
        "ROUND" => unary_number(name, stack, f64::round),
        "FLOOR" => unary_number(name, stack, f64::floor),
        "CEIL" => unary_number(name, stack, f64::ceil),
        "ABS" => unary_number(name, stack, f64::abs),
        "SQRT" => unary_number(name, stack, f64::sqrt),
        "IF" => {
            let when_false = pop(name, stack)?;
            let when_true = pop(name, stack)?;
            let condition = pop(name, stack)?;
            stack.push(if condition.truthy() {
                when_true
            } else {
                when_false
            });
            Ok(())
        }
        _ => {
            log::warn!("unknown function '{name}', yielding 0");
            stack.push(Value::Number(0.0));
            Ok(())
        }
    }
}

/// Strip any dotted namespace prefix and uppercase
fn normalize(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_uppercase()
}

fn pop(function: &str, stack: &mut Vec<Value>) -> ExprResult<Value> {
    stack
        .pop()
        .ok_or_else(|| ExprError::Eval(format!("missing argument for {function}")))
}

fn unary_number(name: &str, stack: &mut Vec<Value>, f: fn(f64) -> f64) -> ExprResult<()> {
    let a = pop(name, stack)?.coerce_number();
    stack.push(Value::Number(finite_or_zero(f(a))));
    Ok(())
}

fn binary_number(name: &str, stack: &mut Vec<Value>, f: fn(f64, f64) -> f64) -> ExprResult<()> {
    let b = pop(name, stack)?.coerce_number();
    let a = pop(name, stack)?.coerce_number();
    stack.push(Value::Number(finite_or_zero(f(a, b))));
    Ok(())
}

/// Non-finite results collapse to 0, matching the coercion rules
pub(crate) fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: &[f64]) -> Value {
        let mut stack: Vec<Value> = args.iter().map(|&n| Value::Number(n)).collect();
        apply(name, &mut stack).unwrap();
        stack.pop().unwrap()
    }

    #[test]
    fn test_binary_builtins() {
        assert_eq!(run("MAX", &[10.0, 20.0]), Value::Number(20.0));
        assert_eq!(run("MIN", &[10.0, 20.0]), Value::Number(10.0));
        assert_eq!(run("POW", &[2.0, 3.0]), Value::Number(8.0));
    }

    #[test]
    fn test_unary_builtins() {
        assert_eq!(run("ROUND", &[3.7]), Value::Number(4.0));
        assert_eq!(run("FLOOR", &[3.9]), Value::Number(3.0));
        assert_eq!(run("CEIL", &[3.1]), Value::Number(4.0));
        assert_eq!(run("ABS", &[-5.0]), Value::Number(5.0));
        assert_eq!(run("SQRT", &[25.0]), Value::Number(5.0));
        // sqrt of a negative collapses to 0 instead of NaN
        assert_eq!(run("SQRT", &[-1.0]), Value::Number(0.0));
    }

    #[test]
    fn test_namespaced_spellings() {
        assert_eq!(run("Math.pow", &[2.0, 3.0]), Value::Number(8.0));
        assert_eq!(run("Math.abs", &[-2.0]), Value::Number(2.0));
    }

    #[test]
    fn test_if_selects_branch() {
        let mut stack = vec![Value::Bool(true), Value::from("yes"), Value::from("no")];
        apply("IF", &mut stack).unwrap();
        assert_eq!(stack.pop(), Some(Value::from("yes")));
    }

    #[test]
    fn test_unknown_function_yields_zero() {
        let mut stack = Vec::new();
        apply("FROBNICATE", &mut stack).unwrap();
        assert_eq!(stack.pop(), Some(Value::Number(0.0)));
    }

    #[test]
    fn test_missing_argument_is_an_error() {
        let mut stack = vec![Value::Number(1.0)];
        assert!(apply("MAX", &mut stack).is_err());
    }

    #[test]
    fn test_namespace_constants() {
        assert_eq!(namespace_constant("Math.PI"), Some(std::f64::consts::PI));
        assert_eq!(namespace_constant("Math.E"), Some(std::f64::consts::E));
        assert_eq!(namespace_constant("Math.TAU"), None);
    }
}
