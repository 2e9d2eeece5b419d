//! # kestrel-expr
//!
//! A small, sandboxed expression language used for translation-rule
//! conditions and for computing mapped values.
//!
//! Expressions are compiled once with [`compile`] and evaluated many times
//! against a [`Vars`] context. Evaluation has no side effects and no access
//! to anything outside the supplied variables.
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `attr['mail']`, `x[0]`, `x.key` | lookup (missing → `null`) |
//! | `== != < <= > >=` | comparison (`1 == 1.0`) |
//! | `a ~= 'regex'`, `a.matches('regex')` | full-string regex match |
//! | `a contains b` | substring / element / key test |
//! | `&& \|\| !` | logic, short-circuiting |
//! | `c ? a : b` | conditional |
//! | `+ - * / %` | arithmetic, `+` also concatenates strings and lists |
//! | `.size() .isEmpty() .trim() .split(s)` ... | built-in methods |
//!
//! ```rust
//! use kestrel_expr::{compile, Vars};
//! use serde_json::json;
//!
//! let expr = compile("attr['email'] != null && attr['email'].endsWith('@example.com')").unwrap();
//! let vars = Vars::new().with("attr", json!({"email": "alice@example.com"}));
//! assert!(expr.evaluate_condition(&vars).unwrap());
//! ```

pub mod error;
pub mod value_utils;
pub mod vars;

mod ast;
mod eval;
mod lexer;
mod parser;

pub use error::{ExprError, ExprResult};
pub use vars::Vars;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A compiled expression. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Expression {
    source: Arc<str>,
    root: Arc<ast::Expr>,
}

/// Compiles `source`, failing on syntax errors and invalid literal regexes.
pub fn compile(source: &str) -> ExprResult<Expression> {
    let tokens = lexer::tokenize(source)?;
    let root = parser::Parser::new(tokens).parse()?;
    Ok(Expression {
        source: Arc::from(source),
        root: Arc::new(root),
    })
}

impl Expression {
    /// The source text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, vars: &Vars) -> ExprResult<Value> {
        eval::eval(&self.root, vars)
    }

    /// Evaluates as a condition: only a boolean `true` is true.
    ///
    /// Null and non-boolean results are `false`, not errors.
    pub fn evaluate_condition(&self, vars: &Vars) -> ExprResult<bool> {
        Ok(matches!(self.evaluate(vars)?, Value::Bool(true)))
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.source).finish()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Expression {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Vars {
        Vars::new()
            .with("idp", "saml-idp")
            .with("attr", json!({"email": "Alice@Example.com", "cn": "Alice", "age": "42"}))
            .with(
                "attrs",
                json!({"memberOf": ["staff", "admins"], "email": ["Alice@Example.com"]}),
            )
            .with("groups", json!(["/staff", "/admins"]))
            .with("count", 3)
            .with("nothing", Value::Null)
    }

    fn eval(source: &str) -> Value {
        compile(source).unwrap().evaluate(&vars()).unwrap()
    }

    fn cond(source: &str) -> bool {
        compile(source).unwrap().evaluate_condition(&vars()).unwrap()
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("true"), json!(true));
        assert_eq!(eval("'text'"), json!("text"));
        assert_eq!(eval("\"text\""), json!("text"));
        assert_eq!(eval("12"), json!(12));
        assert_eq!(eval("1.5"), json!(1.5));
        assert_eq!(eval("null"), Value::Null);
        assert_eq!(eval("['a', 1]"), json!(["a", 1]));
    }

    #[test]
    fn test_lookup_and_missing_values() {
        assert_eq!(eval("attr['cn']"), json!("Alice"));
        assert_eq!(eval("attr.cn"), json!("Alice"));
        assert_eq!(eval("attrs['memberOf'][1]"), json!("admins"));
        assert_eq!(eval("attr['missing']"), Value::Null);
        assert_eq!(eval("attrs['memberOf'][9]"), Value::Null);
        assert_eq!(eval("nothing['x'].y"), Value::Null);
    }

    #[test]
    fn test_unknown_variable_is_error() {
        let err = compile("undefinedVar == 1").unwrap().evaluate(&vars()).unwrap_err();
        assert_eq!(err, ExprError::UnknownVariable("undefinedVar".to_string()));
    }

    #[test]
    fn test_condition_non_boolean_is_false() {
        assert!(!cond("attr['cn']"));
        assert!(!cond("null"));
        assert!(!cond("attr['missing']"));
        assert!(!cond("1"));
        assert!(cond("true"));
    }

    #[test]
    fn test_comparisons() {
        assert!(cond("attr['email'] != null"));
        assert!(cond("attr['missing'] == null"));
        assert!(cond("count > 2 && count <= 3"));
        assert!(cond("count == 3.0"));
        assert!(cond("'abc' < 'abd'"));
        assert!(!cond("nothing < 3"));
        assert!(compile("count < 'x'").unwrap().evaluate(&vars()).is_err());
    }

    #[test]
    fn test_short_circuit() {
        // the right side would fail on an unknown variable
        assert!(!cond("false && undefinedVar"));
        assert!(cond("true || undefinedVar"));
    }

    #[test]
    fn test_regex_match() {
        assert!(cond("attr['email'] ~= '.*@Example\\\\.com'"));
        assert!(!cond("attr['email'] ~= 'Example'"));
        assert!(cond("attr['cn'].matches('A.*')"));
        assert!(!cond("nothing ~= '.*'"));
        assert!(cond("attr['cn'] ~= ('Al' + '.*')"));
    }

    #[test]
    fn test_contains() {
        assert!(cond("groups contains '/staff'"));
        assert!(cond("attrs['memberOf'].contains('admins')"));
        assert!(cond("attr['email'] contains '@'"));
        assert!(cond("attr contains 'cn'"));
        assert!(!cond("nothing contains 'x'"));
    }

    #[test]
    fn test_methods() {
        assert_eq!(eval("attr['email'].toLowerCase()"), json!("alice@example.com"));
        assert_eq!(eval("attr['cn'].toUpperCase()"), json!("ALICE"));
        assert_eq!(eval("'  x '.trim()"), json!("x"));
        assert_eq!(eval("groups.size()"), json!(2));
        assert_eq!(eval("'a,b'.split(',')"), json!(["a", "b"]));
        assert!(cond("nothing.isEmpty()"));
        assert!(cond("attr['cn'].startsWith('Al') && attr['cn'].endsWith('ce')"));
        assert_eq!(eval("nothing.toLowerCase()"), Value::Null);
    }

    #[test]
    fn test_arithmetic_and_concat() {
        assert_eq!(eval("count * 2 + 1"), json!(7));
        assert_eq!(eval("count / 2"), json!(1.5));
        assert_eq!(eval("count % 2"), json!(1));
        assert_eq!(eval("-count"), json!(-3));
        assert_eq!(eval("'cn=' + attr['cn']"), json!("cn=Alice"));
        assert_eq!(eval("idp + ':' + count"), json!("saml-idp:3"));
        assert_eq!(eval("['a'] + ['b']"), json!(["a", "b"]));
        assert_eq!(
            compile("count / 0").unwrap().evaluate(&vars()),
            Err(ExprError::DivisionByZero)
        );
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval("attr['missing'] != null ? 'yes' : 'no'"), json!("no"));
        assert_eq!(eval("count > 1 ? count > 2 ? 'big' : 'mid' : 'small'"), json!("big"));
    }

    #[test]
    fn test_compile_errors() {
        for source in ["", "attr[", "a ==", "1 +* 2", "a.unknown()", "a ~= '['"] {
            let err = compile(source).unwrap_err();
            assert!(err.is_compile_error(), "{source}: {err}");
        }
    }

    #[test]
    fn test_expression_equality_by_source() {
        assert_eq!(compile("a == 1").unwrap(), compile("a == 1").unwrap());
        assert_ne!(compile("a == 1").unwrap(), compile("a==1").unwrap());
        assert_eq!(compile("a == 1").unwrap().to_string(), "a == 1");
    }

    #[test]
    fn test_long_chains_compile_only_when_evaluable() {
        for terms in [10, 64, 126, 127, 128, 129, 255, 256, 300] {
            let mut alternatives: Vec<String> = (0..terms).map(|i| format!("idp == 'idp{i}'")).collect();
            alternatives.push("idp == 'saml-idp'".to_string());
            let source = alternatives.join(" || ");

            match compile(&source) {
                Ok(expr) => assert_eq!(expr.evaluate_condition(&vars()), Ok(true), "{terms} terms"),
                Err(err) => assert!(matches!(err, ExprError::DepthExceeded(_)), "{terms} terms: {err}"),
            }
        }

        assert!(compile(&vec!["idp == 'x'"; 100].join(" || ")).is_ok());
        assert!(compile(&vec!["idp == 'x'"; 300].join(" || ")).is_err());
    }

    #[test]
    fn test_shared_across_threads() {
        let expr = compile("count > 1").unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let expr = expr.clone();
                std::thread::spawn(move || expr.evaluate_condition(&vars()).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
