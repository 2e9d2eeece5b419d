//! Tokenizer.

use crate::error::{ExprError, ExprResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    Contains,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Question,
    Colon,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Tilde,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str(_) => "string literal".to_string(),
            Token::Int(_) | Token::Float(_) => "number".to_string(),
            Token::Eof => "end of expression".to_string(),
            other => format!("{other:?}"),
        }
    }
}

/// A token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(source: &str) -> ExprResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let (offset, c) = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let (token, next) = lex_number(source, &chars, pos)?;
            tokens.push(Spanned { token, offset });
            pos = next;
            continue;
        }

        if c == '_' || c == '$' || c.is_alphabetic() {
            let start = pos;
            while pos < chars.len() {
                let ch = chars[pos].1;
                if ch == '_' || ch == '$' || ch.is_alphanumeric() {
                    pos += 1;
                } else {
                    break;
                }
            }
            let word: String = chars[start..pos].iter().map(|(_, ch)| ch).collect();
            let token = match word.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" | "nil" => Token::Null,
                "contains" => Token::Contains,
                _ => Token::Ident(word),
            };
            tokens.push(Spanned { token, offset });
            continue;
        }

        if c == '\'' || c == '"' {
            let (value, next) = lex_string(&chars, pos, c)?;
            tokens.push(Spanned {
                token: Token::Str(value),
                offset,
            });
            pos = next;
            continue;
        }

        let peek = chars.get(pos + 1).map(|(_, ch)| *ch);
        let (token, width) = match (c, peek) {
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('~', Some('=')) => (Token::Tilde, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('.', _) => (Token::Dot, 1),
            (',', _) => (Token::Comma, 1),
            ('?', _) => (Token::Question, 1),
            (':', _) => (Token::Colon, 1),
            ('!', _) => (Token::Bang, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            _ => {
                return Err(ExprError::syntax(
                    offset,
                    format!("unexpected character '{c}'"),
                ));
            }
        };
        tokens.push(Spanned { token, offset });
        pos += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

fn lex_number(source: &str, chars: &[(usize, char)], start: usize) -> ExprResult<(Token, usize)> {
    let mut pos = start;
    let mut is_float = false;
    while pos < chars.len() {
        let ch = chars[pos].1;
        if ch.is_ascii_digit() {
            pos += 1;
        } else if ch == '.'
            && !is_float
            && chars.get(pos + 1).is_some_and(|(_, next)| next.is_ascii_digit())
        {
            is_float = true;
            pos += 1;
        } else {
            break;
        }
    }

    let begin = chars[start].0;
    let end = chars.get(pos).map_or(source.len(), |(offset, _)| *offset);
    let text = &source[begin..end];
    let token = if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|e| ExprError::syntax(begin, format!("invalid number '{text}': {e}")))?
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|e| ExprError::syntax(begin, format!("invalid number '{text}': {e}")))?
    };
    Ok((token, pos))
}

fn lex_string(chars: &[(usize, char)], start: usize, quote: char) -> ExprResult<(String, usize)> {
    let mut value = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        let ch = chars[pos].1;
        if ch == quote {
            return Ok((value, pos + 1));
        }
        if ch == '\\' {
            let Some((_, escaped)) = chars.get(pos + 1) else {
                break;
            };
            value.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => *other,
            });
            pos += 2;
            continue;
        }
        value.push(ch);
        pos += 1;
    }
    Err(ExprError::syntax(chars[start].0, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a == b && !c || d ~= 'x'"),
            vec![
                Token::Ident("a".into()),
                Token::EqEq,
                Token::Ident("b".into()),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("c".into()),
                Token::OrOr,
                Token::Ident("d".into()),
                Token::Tilde,
                Token::Str("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42 3.5"), vec![Token::Int(42), Token::Float(3.5), Token::Eof]);
        // method call on an integer literal is not a float
        assert_eq!(
            kinds("1.size"),
            vec![Token::Int(1), Token::Dot, Token::Ident("size".into()), Token::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\"b""#),
            vec![Token::Str("it's".into()), Token::Str("a\"b".into()), Token::Eof]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("attr['mail").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { offset: 5, .. }));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(matches!(
            tokenize("a # b"),
            Err(ExprError::Syntax { offset: 2, .. })
        ));
    }
}
