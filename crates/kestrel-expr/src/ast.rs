//! Expression syntax tree.

use crate::error::{ExprError, ExprResult};
use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Maximum length for regex patterns.
pub(crate) const MAX_REGEX_PATTERN_LEN: usize = 1000;

const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Contains,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

/// Built-in methods callable as `value.method(args)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Size,
    IsEmpty,
    Contains,
    StartsWith,
    EndsWith,
    ToLowerCase,
    ToUpperCase,
    Trim,
    Split,
}

impl Method {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "size" | "length" => Method::Size,
            "isEmpty" => Method::IsEmpty,
            "contains" => Method::Contains,
            "startsWith" => Method::StartsWith,
            "endsWith" => Method::EndsWith,
            "toLowerCase" => Method::ToLowerCase,
            "toUpperCase" => Method::ToUpperCase,
            "trim" => Method::Trim,
            "split" => Method::Split,
            _ => return None,
        })
    }

    pub(crate) fn arity(self) -> usize {
        match self {
            Method::Contains | Method::StartsWith | Method::EndsWith | Method::Split => 1,
            _ => 0,
        }
    }
}

/// Right-hand side of a regex match.
#[derive(Debug, Clone)]
pub(crate) enum Pattern {
    /// Literal pattern compiled at parse time.
    Compiled(Regex),
    Dynamic(Box<Expr>),
}

/// Compiles `pattern` anchored at both ends.
pub(crate) fn compile_pattern(pattern: &str) -> ExprResult<Regex> {
    if pattern.len() > MAX_REGEX_PATTERN_LEN {
        return Err(ExprError::Regex {
            pattern: pattern.chars().take(32).collect(),
            message: format!("pattern longer than {MAX_REGEX_PATTERN_LEN} bytes"),
        });
    }
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| ExprError::Regex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    Variable(String),
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Full-string regex match (`~=` and `.matches(..)`).
    Match {
        subject: Box<Expr>,
        pattern: Pattern,
    },
    Conditional {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Property {
        object: Box<Expr>,
        name: String,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: Method,
        args: Vec<Expr>,
    },
}
