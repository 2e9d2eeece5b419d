//! AST evaluation.

use crate::ast::{BinaryOp, Expr, Method, Pattern, UnaryOp, compile_pattern};
use crate::error::{ExprError, ExprResult};
use crate::value_utils::{is_truthy, loose_eq, number_as_f64, to_display_string, value_type_name};
use crate::vars::Vars;
use serde_json::{Value, json};
use std::cmp::Ordering;

/// Maximum recursion depth for expression evaluation
pub(crate) const MAX_RECURSION_DEPTH: usize = 256;

pub(crate) fn eval(expr: &Expr, vars: &Vars) -> ExprResult<Value> {
    eval_with_depth(expr, vars, 0)
}

fn eval_with_depth(expr: &Expr, vars: &Vars, depth: usize) -> ExprResult<Value> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(ExprError::DepthExceeded(MAX_RECURSION_DEPTH));
    }
    let next = depth + 1;

    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Variable(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnknownVariable(name.clone())),

        Expr::List(items) => items
            .iter()
            .map(|item| eval_with_depth(item, vars, next))
            .collect::<ExprResult<Vec<_>>>()
            .map(Value::Array),

        Expr::Unary { op, operand } => {
            let value = eval_with_depth(operand, vars, next)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Negate => match &value {
                    Value::Number(n) => match n.as_i64() {
                        Some(i) => Ok(i
                            .checked_neg()
                            .map_or_else(|| json!(-(i as f64)), |v| json!(v))),
                        None => Ok(json!(-number_as_f64(n).unwrap_or(0.0))),
                    },
                    other => Err(ExprError::type_error("number", value_type_name(other))),
                },
            }
        }

        Expr::Binary { left, op, right } => eval_binary(*op, left, right, vars, next),

        Expr::Match { subject, pattern } => {
            let subject = eval_with_depth(subject, vars, next)?;
            let Value::String(text) = subject else {
                return Ok(Value::Bool(false));
            };
            let matched = match pattern {
                Pattern::Compiled(regex) => regex.is_match(&text),
                Pattern::Dynamic(pattern_expr) => {
                    match eval_with_depth(pattern_expr, vars, next)? {
                        Value::String(p) => compile_pattern(&p)?.is_match(&text),
                        Value::Null => false,
                        other => {
                            return Err(ExprError::type_error(
                                "string pattern",
                                value_type_name(&other),
                            ));
                        }
                    }
                }
            };
            Ok(Value::Bool(matched))
        }

        Expr::Conditional {
            condition,
            then_expr,
            else_expr,
        } => {
            if is_truthy(&eval_with_depth(condition, vars, next)?) {
                eval_with_depth(then_expr, vars, next)
            } else {
                eval_with_depth(else_expr, vars, next)
            }
        }

        Expr::Index { object, index } => {
            let object = eval_with_depth(object, vars, next)?;
            let index = eval_with_depth(index, vars, next)?;
            Ok(access_index(&object, &index))
        }

        Expr::Property { object, name } => {
            let object = eval_with_depth(object, vars, next)?;
            Ok(match object {
                Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }

        Expr::MethodCall {
            receiver,
            method,
            args,
        } => {
            let receiver = eval_with_depth(receiver, vars, next)?;
            let args = args
                .iter()
                .map(|arg| eval_with_depth(arg, vars, next))
                .collect::<ExprResult<Vec<_>>>()?;
            call_method(*method, &receiver, &args)
        }
    }
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, vars: &Vars, depth: usize) -> ExprResult<Value> {
    // Short-circuit logical operators
    match op {
        BinaryOp::And => {
            if !is_truthy(&eval_with_depth(left, vars, depth)?) {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(is_truthy(&eval_with_depth(right, vars, depth)?)));
        }
        BinaryOp::Or => {
            if is_truthy(&eval_with_depth(left, vars, depth)?) {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(is_truthy(&eval_with_depth(right, vars, depth)?)));
        }
        _ => {}
    }

    let l = eval_with_depth(left, vars, depth)?;
    let r = eval_with_depth(right, vars, depth)?;
    match op {
        BinaryOp::Equal => Ok(Value::Bool(loose_eq(&l, &r))),
        BinaryOp::NotEqual => Ok(Value::Bool(!loose_eq(&l, &r))),
        BinaryOp::LessThan => compare(&l, &r, Ordering::is_lt),
        BinaryOp::LessEqual => compare(&l, &r, Ordering::is_le),
        BinaryOp::GreaterThan => compare(&l, &r, Ordering::is_gt),
        BinaryOp::GreaterEqual => compare(&l, &r, Ordering::is_ge),
        BinaryOp::Contains => Ok(Value::Bool(contains(&l, &r))),
        BinaryOp::Add => add(&l, &r),
        BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
            arithmetic(op, &l, &r)
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// Ordering comparison. Any null operand compares false.
fn compare(l: &Value, r: &Value, accept: fn(Ordering) -> bool) -> ExprResult<Value> {
    let ordering = match (l, r) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Bool(false)),
        (Value::Number(a), Value::Number(b)) => {
            let (Some(a), Some(b)) = (number_as_f64(a), number_as_f64(b)) else {
                return Ok(Value::Bool(false));
            };
            match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                None => return Ok(Value::Bool(false)),
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            return Err(ExprError::type_error(
                "two numbers or two strings",
                format!("{} and {}", value_type_name(l), value_type_name(r)),
            ));
        }
    };
    Ok(Value::Bool(accept(ordering)))
}

fn contains(container: &Value, item: &Value) -> bool {
    match (container, item) {
        (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
        (Value::Array(items), _) => items.iter().any(|v| loose_eq(v, item)),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

fn add(l: &Value, r: &Value) -> ExprResult<Value> {
    match (l, r) {
        (Value::Number(_), Value::Number(_)) => arithmetic(BinaryOp::Add, l, r),
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
        }
        (Value::String(_), _) | (_, Value::String(_)) => {
            let mut result = to_display_string(l);
            result.push_str(&to_display_string(r));
            Ok(Value::String(result))
        }
        _ => Err(ExprError::type_error(
            "number or string",
            format!("{} and {}", value_type_name(l), value_type_name(r)),
        )),
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> ExprResult<Value> {
    let (Value::Number(a), Value::Number(b)) = (l, r) else {
        return Err(ExprError::type_error(
            "number",
            format!("{} and {}", value_type_name(l), value_type_name(r)),
        ));
    };

    // Integer arithmetic when both sides are integers and nothing overflows
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let checked = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Subtract => x.checked_sub(y),
            BinaryOp::Multiply => x.checked_mul(y),
            BinaryOp::Modulo => {
                if y == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                x.checked_rem(y)
            }
            _ => None,
        };
        if let Some(v) = checked {
            return Ok(json!(v));
        }
    }

    let x = number_as_f64(a).unwrap_or(0.0);
    let y = number_as_f64(b).unwrap_or(0.0);
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Subtract => x - y,
        BinaryOp::Multiply => x * y,
        BinaryOp::Divide | BinaryOp::Modulo if y == 0.0 => return Err(ExprError::DivisionByZero),
        BinaryOp::Divide => x / y,
        BinaryOp::Modulo => x % y,
        _ => unreachable!("non-arithmetic operator"),
    };
    Ok(json!(result))
}

fn access_index(object: &Value, index: &Value) -> Value {
    match (object, index) {
        (Value::Object(map), Value::String(key)) => map.get(key).cloned().unwrap_or(Value::Null),
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn call_method(method: Method, receiver: &Value, args: &[Value]) -> ExprResult<Value> {
    match method {
        Method::Size => Ok(match receiver {
            Value::Null => json!(0),
            Value::String(s) => json!(s.chars().count()),
            Value::Array(items) => json!(items.len()),
            Value::Object(map) => json!(map.len()),
            other => return Err(ExprError::type_error("string or collection", value_type_name(other))),
        }),
        Method::IsEmpty => Ok(Value::Bool(match receiver {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        })),
        Method::Contains => Ok(Value::Bool(contains(receiver, &args[0]))),
        Method::StartsWith | Method::EndsWith => match (receiver, &args[0]) {
            (Value::Null, _) => Ok(Value::Bool(false)),
            (Value::String(s), Value::String(affix)) => Ok(Value::Bool(if method == Method::StartsWith {
                s.starts_with(affix.as_str())
            } else {
                s.ends_with(affix.as_str())
            })),
            (Value::String(_), other) => Err(ExprError::type_error("string argument", value_type_name(other))),
            (other, _) => Err(ExprError::type_error("string", value_type_name(other))),
        },
        Method::ToLowerCase | Method::ToUpperCase | Method::Trim => match receiver {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::String(match method {
                Method::ToLowerCase => s.to_lowercase(),
                Method::ToUpperCase => s.to_uppercase(),
                _ => s.trim().to_string(),
            })),
            other => Err(ExprError::type_error("string", value_type_name(other))),
        },
        Method::Split => match (receiver, &args[0]) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::String(s), Value::String(sep)) if !sep.is_empty() => Ok(Value::Array(
                s.split(sep.as_str()).map(|part| Value::String(part.to_string())).collect(),
            )),
            (Value::String(_), other) => Err(ExprError::type_error("non-empty string separator", value_type_name(other))),
            (other, _) => Err(ExprError::type_error("string", value_type_name(other))),
        },
    }
}
