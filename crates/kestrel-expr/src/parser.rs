//! Recursive-descent parser.
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, `== != ~=`, `< <= > >=`,
//! `contains`, `+ -`, `* / %`, unary `! -`, postfix `[..]` `.name` `.method(..)`.

use crate::ast::{BinaryOp, Expr, Method, Pattern, UnaryOp, compile_pattern};
use crate::error::{ExprError, ExprResult};
use crate::eval::MAX_RECURSION_DEPTH;
use crate::lexer::{Spanned, Token};
use serde_json::{Number, Value};

/// Maximum nesting accepted by the parser.
///
/// Bounds both parser recursion and the height of the built tree, counted in
/// nodes from the root to the deepest leaf. Operator chains and postfix
/// chains are built in loops, so every composite node checks its height.
pub(crate) const MAX_PARSE_DEPTH: usize = 128;

// Every tree that compiles must evaluate within the evaluator's limit.
const _: () = assert!(MAX_PARSE_DEPTH < MAX_RECURSION_DEPTH);

/// A parsed subtree and its height.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }
}

/// Wraps `expr` as a node above children at most `children` high.
fn node(expr: Expr, children: usize) -> ExprResult<Node> {
    let height = children + 1;
    if height > MAX_PARSE_DEPTH {
        return Err(ExprError::DepthExceeded(MAX_PARSE_DEPTH));
    }
    Ok(Node { expr, height })
}

fn binary(left: Node, op: BinaryOp, right: Node) -> ExprResult<Node> {
    let children = left.height.max(right.height);
    node(
        Expr::Binary {
            left: Box::new(left.expr),
            op,
            right: Box::new(right.expr),
        },
        children,
    )
}

/// A literal string pattern is compiled now; anything else is evaluated per call.
fn match_node(subject: Node, pattern: Node) -> ExprResult<Node> {
    let (pattern, pattern_height) = match pattern.expr {
        Expr::Literal(Value::String(source)) => (Pattern::Compiled(compile_pattern(&source)?), 0),
        other => (Pattern::Dynamic(Box::new(other)), pattern.height),
    };
    let children = subject.height.max(pattern_height);
    node(
        Expr::Match {
            subject: Box::new(subject.expr),
            pattern,
        },
        children,
    )
}

fn tallest(nodes: &[Node]) -> usize {
    nodes.iter().map(|n| n.height).max().unwrap_or(0)
}

fn into_exprs(nodes: Vec<Node>) -> Vec<Expr> {
    nodes.into_iter().map(|n| n.expr).collect()
}

pub(crate) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parses a complete expression, rejecting trailing tokens.
    pub(crate) fn parse(mut self) -> ExprResult<Expr> {
        if self.peek() == &Token::Eof {
            return Err(ExprError::syntax(0, "empty expression"));
        }
        let root = self.parse_ternary()?;
        if self.peek() != &Token::Eof {
            return Err(self.unexpected("end of expression"));
        }
        Ok(root.expr)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> ExprResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> ExprError {
        ExprError::syntax(
            self.offset(),
            format!("expected {expected}, found {}", self.peek().describe()),
        )
    }

    fn enter(&mut self) -> ExprResult<()> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(ExprError::DepthExceeded(MAX_PARSE_DEPTH));
        }
        Ok(())
    }

    fn parse_ternary(&mut self) -> ExprResult<Node> {
        self.enter()?;
        let condition = self.parse_or()?;
        let parsed = if self.eat(&Token::Question) {
            let then_node = self.parse_ternary()?;
            self.expect(Token::Colon, "':'")?;
            let else_node = self.parse_ternary()?;
            let children = condition.height.max(then_node.height).max(else_node.height);
            node(
                Expr::Conditional {
                    condition: Box::new(condition.expr),
                    then_expr: Box::new(then_node.expr),
                    else_expr: Box::new(else_node.expr),
                },
                children,
            )?
        } else {
            condition
        };
        self.depth -= 1;
        Ok(parsed)
    }

    fn parse_or(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = binary(left, BinaryOp::And, right)?;
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => Some(BinaryOp::Equal),
                Token::NotEq => Some(BinaryOp::NotEqual),
                Token::Tilde => None,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = match op {
                Some(op) => binary(left, op, right)?,
                None => match_node(left, right)?,
            };
        }
    }

    fn parse_relational(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_contains()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::LessThan,
                Token::Le => BinaryOp::LessEqual,
                Token::Gt => BinaryOp::GreaterThan,
                Token::Ge => BinaryOp::GreaterEqual,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_contains()?;
            left = binary(left, op, right)?;
        }
    }

    fn parse_contains(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_additive()?;
        while self.eat(&Token::Contains) {
            let right = self.parse_additive()?;
            left = binary(left, BinaryOp::Contains, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right)?;
        }
    }

    fn parse_multiplicative(&mut self) -> ExprResult<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                Token::Percent => BinaryOp::Modulo,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right)?;
        }
    }

    fn parse_unary(&mut self) -> ExprResult<Node> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        let children = operand.height;
        node(
            Expr::Unary {
                op,
                operand: Box::new(operand.expr),
            },
            children,
        )
    }

    fn parse_postfix(&mut self) -> ExprResult<Node> {
        let mut parsed = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_ternary()?;
                    self.expect(Token::RBracket, "']'")?;
                    let children = parsed.height.max(index.height);
                    parsed = node(
                        Expr::Index {
                            object: Box::new(parsed.expr),
                            index: Box::new(index.expr),
                        },
                        children,
                    )?;
                }
                Token::Dot => {
                    self.advance();
                    let name_offset = self.offset();
                    let name = match self.advance() {
                        Token::Ident(name) => name,
                        // `x.contains(..)` lexes as the keyword
                        Token::Contains => "contains".to_string(),
                        _ => return Err(ExprError::syntax(name_offset, "expected property or method name")),
                    };
                    if self.peek() == &Token::LParen {
                        parsed = self.parse_method_call(parsed, &name, name_offset)?;
                    } else {
                        let children = parsed.height;
                        parsed = node(
                            Expr::Property {
                                object: Box::new(parsed.expr),
                                name,
                            },
                            children,
                        )?;
                    }
                }
                _ => return Ok(parsed),
            }
        }
    }

    fn parse_method_call(&mut self, receiver: Node, name: &str, name_offset: usize) -> ExprResult<Node> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_ternary()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, "',' or ')'")?;
            }
        }

        if name == "matches" {
            let [pattern] = <[Node; 1]>::try_from(args).map_err(|_| {
                ExprError::syntax(name_offset, "method 'matches' takes 1 argument")
            })?;
            return match_node(receiver, pattern);
        }

        let method = Method::from_name(name)
            .ok_or_else(|| ExprError::syntax(name_offset, format!("unknown method '{name}'")))?;
        if args.len() != method.arity() {
            return Err(ExprError::syntax(
                name_offset,
                format!(
                    "method '{name}' takes {} argument(s), got {}",
                    method.arity(),
                    args.len()
                ),
            ));
        }
        let children = receiver.height.max(tallest(&args));
        node(
            Expr::MethodCall {
                receiver: Box::new(receiver.expr),
                method,
                args: into_exprs(args),
            },
            children,
        )
    }

    fn parse_primary(&mut self) -> ExprResult<Node> {
        let offset = self.offset();
        match self.advance() {
            Token::Int(i) => Ok(Node::leaf(Expr::Literal(Value::Number(i.into())))),
            Token::Float(f) => Number::from_f64(f)
                .map(|n| Node::leaf(Expr::Literal(Value::Number(n))))
                .ok_or_else(|| ExprError::syntax(offset, "non-finite number")),
            Token::Str(s) => Ok(Node::leaf(Expr::Literal(Value::String(s)))),
            Token::True => Ok(Node::leaf(Expr::Literal(Value::Bool(true)))),
            Token::False => Ok(Node::leaf(Expr::Literal(Value::Bool(false)))),
            Token::Null => Ok(Node::leaf(Expr::Literal(Value::Null))),
            Token::Ident(name) => Ok(Node::leaf(Expr::Variable(name))),
            Token::LParen => {
                let inner = self.parse_ternary()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_ternary()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(Token::Comma, "',' or ']'")?;
                    }
                }
                let children = tallest(&items);
                node(Expr::List(into_exprs(items)), children)
            }
            other => Err(ExprError::syntax(
                offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> ExprResult<Expr> {
        Parser::new(tokenize(source)?).parse()
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a || b && c").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Or, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse("attrs['mail'][0].toLowerCase()").unwrap();
        assert!(matches!(expr, Expr::MethodCall { method: Method::ToLowerCase, .. }));
    }

    #[test]
    fn test_literal_regex_compiled_once() {
        let expr = parse("attr['mail'] ~= '.*@example\\\\.com'").unwrap();
        assert!(matches!(expr, Expr::Match { pattern: Pattern::Compiled(_), .. }));
    }

    #[test]
    fn test_invalid_literal_regex_rejected() {
        assert!(matches!(parse("a ~= '('"), Err(ExprError::Regex { .. })));
    }

    #[test]
    fn test_unknown_method() {
        let err = parse("a.frobnicate()").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { offset: 2, .. }));
    }

    #[test]
    fn test_method_arity() {
        assert!(parse("a.startsWith()").is_err());
        assert!(parse("a.size(1)").is_err());
        assert!(parse("a.matches('x', 'y')").is_err());
    }

    #[test]
    fn test_trailing_tokens() {
        assert!(parse("a b").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_nesting_bounded() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(parse(&deep), Err(ExprError::DepthExceeded(_))));
    }

    #[test]
    fn test_long_operator_chain_rejected() {
        let chain = vec!["1"; 200_000].join(" + ");
        assert!(matches!(parse(&chain), Err(ExprError::DepthExceeded(MAX_PARSE_DEPTH))));

        let chain = vec!["a"; 200_000].join(" || ");
        assert!(matches!(parse(&chain), Err(ExprError::DepthExceeded(_))));
    }

    #[test]
    fn test_long_postfix_chain_rejected() {
        let chain = format!("a{}", ".b".repeat(10_000));
        assert!(matches!(parse(&chain), Err(ExprError::DepthExceeded(_))));

        let chain = format!("a{}", "[0]".repeat(10_000));
        assert!(matches!(parse(&chain), Err(ExprError::DepthExceeded(_))));
    }

    #[test]
    fn test_chain_at_bound() {
        // n terms of a flat chain build a tree n nodes high
        let fits = vec!["1"; MAX_PARSE_DEPTH].join(" + ");
        assert!(parse(&fits).is_ok());

        let too_tall = vec!["1"; MAX_PARSE_DEPTH + 1].join(" + ");
        assert!(matches!(parse(&too_tall), Err(ExprError::DepthExceeded(_))));
    }
}
