use crate::Span;
use crate::lexer::{LexError, Token, TokenKind, Tokenizer};
use crate::stack::ensure_sufficient_stack;
use crate::types::{Builtin, Symbol, Term};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected token '{}' at {}, expected {expected}", .found.kind, .found.span)]
    UnexpectedToken { found: Token, expected: String },
    #[error("unexpected close paren at {0}")]
    UnexpectedCloseParen(Span),
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("invalid dotted pair at {0}, expected ')' after the final element")]
    InvalidDotSyntax(Span),
    #[error(transparent)]
    Lexer(#[from] LexError),
    #[error("{0}")]
    MalformedForm(String),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

/// Reads one term starting at the current token and advances past it.
pub fn read(tokenizer: &mut Tokenizer) -> ParseResult<Term> {
    ensure_sufficient_stack(|| -> ParseResult<Term> {
        let token = tokenizer.peek()?.clone();
        match token.kind {
            TokenKind::OpenParen => {
                tokenizer.advance();
                read_list(tokenizer)
            }
            TokenKind::CloseParen => Err(ParseError::UnexpectedCloseParen(token.span)),
            TokenKind::Integer(n) => {
                tokenizer.advance();
                Ok(Term::Number(n))
            }
            TokenKind::True => {
                tokenizer.advance();
                Ok(Term::Boolean(true))
            }
            TokenKind::False => {
                tokenizer.advance();
                Ok(Term::Boolean(false))
            }
            TokenKind::Identifier(name) => {
                tokenizer.advance();
                Ok(Term::Symbol(match Builtin::from_name(&name) {
                    Some(builtin) => Symbol::Builtin(builtin),
                    None => Symbol::Identifier(name),
                }))
            }
            TokenKind::Quote => {
                tokenizer.advance();
                // 'x is sugar for (quote x)
                Ok(Term::new_quote(read(tokenizer)?))
            }
            TokenKind::Dot => Err(ParseError::UnexpectedToken {
                found: token,
                expected: "an expression".to_string(),
            }),
            TokenKind::End => Err(ParseError::UnexpectedEof("an expression".to_string())),
        }
    })
}

/// Reads the remainder of a list whose '(' has already been consumed.
pub fn read_list(tokenizer: &mut Tokenizer) -> ParseResult<Term> {
    let mut items = Vec::new();
    let tail = loop {
        let token = tokenizer.peek()?.clone();
        match token.kind {
            TokenKind::CloseParen => {
                tokenizer.advance();
                break Term::Empty;
            }
            TokenKind::End => return Err(ParseError::UnexpectedEof("')'".to_string())),
            TokenKind::Dot if !items.is_empty() => {
                tokenizer.advance();
                let tail = read(tokenizer)?;
                let closing = tokenizer.peek()?;
                if closing.kind != TokenKind::CloseParen {
                    return Err(ParseError::InvalidDotSyntax(token.span.merge(closing.span)));
                }
                tokenizer.advance();
                break tail;
            }
            _ => items.push(read(tokenizer)?),
        }
    };
    Ok(items
        .into_iter()
        .rev()
        .fold(tail, |tail, item| Term::new_pair(item, tail)))
}

// Helper function to lex and parse exactly one term from a string
pub fn parse_str(input: &str) -> ParseResult<Term> {
    let mut tokenizer = Tokenizer::new(input);
    let term = read(&mut tokenizer)?;
    let next = tokenizer.peek()?;
    if next.kind != TokenKind::End {
        return Err(ParseError::UnexpectedToken {
            found: next.clone(),
            expected: "end of input".to_string(),
        });
    }
    Ok(term)
}

/// Parses every top-level term in `input`, in order.
pub fn parse_all(input: &str) -> ParseResult<Vec<Term>> {
    let mut tokenizer = Tokenizer::new(input);
    let mut terms = Vec::new();
    while !tokenizer.at_end() {
        terms.push(read(&mut tokenizer)?);
    }
    Ok(terms)
}
