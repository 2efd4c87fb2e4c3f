use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

// Raw lexemes as recognised by logos. `End` is synthesised by the Tokenizer.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(skip r";[^\n\r]*")] // Skip comments
#[logos(error = LexErrorKind)]
enum Lexeme {
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("'")]
    Quote,
    #[token(".")]
    Dot,
    #[token("#t")]
    True,
    #[token("#f")]
    False,
    #[regex(r"-?[0-9]+", |lex| {
        let slice = lex.slice();
        slice
            .parse::<i64>()
            .map_err(|_| LexErrorKind::IntegerOutOfRange(slice.to_string()))
    })]
    Integer(i64),
    // A leading '-' only starts an identifier when no digit follows it, and
    // '.' may only appear mid-identifier.
    #[regex(r"[a-zA-Z+*/<=>!?:$%_&~^]([a-zA-Z0-9+\-*/<=>!?:$%_&~^.]*[a-zA-Z0-9+\-*/<=>!?:$%_&~^])?", |lex| lex.slice().to_string())]
    #[regex(r"-([a-zA-Z+\-*/<=>!?:$%_&~^]([a-zA-Z0-9+\-*/<=>!?:$%_&~^.]*[a-zA-Z0-9+\-*/<=>!?:$%_&~^])?|\.[a-zA-Z0-9+\-*/<=>!?:$%_&~^.]*[a-zA-Z0-9+\-*/<=>!?:$%_&~^])?", |lex| lex.slice().to_string())]
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Integer(i64),
    OpenParen,
    CloseParen,
    Quote,
    Dot,
    Identifier(String),
    True,
    False,
    End,
}

impl From<Lexeme> for TokenKind {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::OpenParen => TokenKind::OpenParen,
            Lexeme::CloseParen => TokenKind::CloseParen,
            Lexeme::Quote => TokenKind::Quote,
            Lexeme::Dot => TokenKind::Dot,
            Lexeme::True => TokenKind::True,
            Lexeme::False => TokenKind::False,
            Lexeme::Integer(n) => TokenKind::Integer(n),
            Lexeme::Identifier(name) => TokenKind::Identifier(name),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::OpenParen => write!(f, "("),
            TokenKind::CloseParen => write!(f, ")"),
            TokenKind::Quote => write!(f, "'"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::True => write!(f, "#t"),
            TokenKind::False => write!(f, "#f"),
            TokenKind::End => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("integer literal out of range: '{0}'")]
    IntegerOutOfRange(String),
    #[default]
    #[error("unrecognized token")]
    UnrecognizedToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} '{text}' at {span}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub text: String,
    pub span: Span,
}

/// Stateful cursor over the source text, one token of lookahead.
///
/// The cursor always sits on a token: the first one after construction, and
/// [`TokenKind::End`] once the input is exhausted. Lexing failures are stored
/// in place of the token and reported by [`Tokenizer::peek`].
pub struct Tokenizer<'src> {
    lexer: logos::Lexer<'src, Lexeme>,
    current: Result<Token, LexError>,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut tokenizer = Tokenizer {
            lexer: Lexeme::lexer(source),
            current: Ok(Token {
                kind: TokenKind::End,
                span: Span::default(),
            }),
        };
        tokenizer.advance();
        tokenizer
    }

    /// The token under the cursor, without consuming it.
    pub fn peek(&self) -> Result<&Token, LexError> {
        self.current.as_ref().map_err(Clone::clone)
    }

    /// Moves past the current token. Stays on `End` once reached.
    pub fn advance(&mut self) {
        self.current = match self.lexer.next() {
            Some(Ok(lexeme)) => Ok(Token {
                kind: lexeme.into(),
                span: self.lexer.span().into(),
            }),
            Some(Err(kind)) => Err(LexError {
                kind,
                text: self.lexer.slice().to_string(),
                span: self.lexer.span().into(),
            }),
            None => {
                let end = self.lexer.source().len();
                Ok(Token {
                    kind: TokenKind::End,
                    span: Span::new(end, end),
                })
            }
        };
    }

    pub fn at_end(&self) -> bool {
        matches!(
            self.current,
            Ok(Token {
                kind: TokenKind::End,
                ..
            })
        )
    }

    /// Span of the current token (or of the offending text on a lexing failure).
    pub fn span(&self) -> Span {
        match &self.current {
            Ok(token) => token.span,
            Err(error) => error.span,
        }
    }
}

// Helper function to tokenize a string directly (useful for tests, completion and benches)
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    while !tokenizer.at_end() {
        tokens.push(tokenizer.peek()?.clone());
        tokenizer.advance();
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_string())
    }

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        match tokenize(input) {
            Ok(tokens) => {
                let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
                assert_eq!(kinds, expected, "Input: '{}'", input);
            }
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e),
        }
    }

    // Helper to simplify testing for lexer errors
    fn assert_lexer_error(input: &str, expected: LexErrorKind) {
        match tokenize(input) {
            Ok(tokens) => panic!(
                "Expected lexing to fail for input '{}', but got tokens: {:?}",
                input, tokens
            ),
            Err(e) => assert_eq!(e.kind, expected, "Input: '{}'", input),
        }
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("   \n  ", vec![]);
    }

    #[test]
    fn test_structural_tokens() {
        assert_tokens("()", vec![TokenKind::OpenParen, TokenKind::CloseParen]);
        assert_tokens(
            "( ' . )",
            vec![
                TokenKind::OpenParen,
                TokenKind::Quote,
                TokenKind::Dot,
                TokenKind::CloseParen,
            ],
        );
        assert_tokens("#t #f", vec![TokenKind::True, TokenKind::False]);
    }

    #[test]
    fn test_integers() {
        assert_tokens("123", vec![TokenKind::Integer(123)]);
        assert_tokens("-45", vec![TokenKind::Integer(-45)]);
        assert_tokens("0", vec![TokenKind::Integer(0)]);
        // Digits stop the integer, the rest is a new token
        assert_tokens("5a", vec![TokenKind::Integer(5), ident("a")]);
        assert_tokens("-5a", vec![TokenKind::Integer(-5), ident("a")]);
        assert_tokens(
            "1.5",
            vec![TokenKind::Integer(1), TokenKind::Dot, TokenKind::Integer(5)],
        );
    }

    #[test]
    fn test_identifiers() {
        assert_tokens("foo", vec![ident("foo")]);
        assert_tokens("+", vec![ident("+")]);
        assert_tokens("-", vec![ident("-")]);
        assert_tokens("<=", vec![ident("<=")]);
        assert_tokens("set-car!", vec![ident("set-car!")]);
        assert_tokens("list?", vec![ident("list?")]);
        assert_tokens("x1", vec![ident("x1")]);
        assert_tokens("+5", vec![ident("+5")]);
        assert_tokens("--5", vec![ident("--5")]);
        assert_tokens("a.b", vec![ident("a.b")]);
        assert_tokens("-a", vec![ident("-a")]);
    }

    #[test]
    fn test_dot_only_inside_identifiers() {
        assert_tokens("a.b.c", vec![ident("a.b.c")]);
        assert_tokens("a.", vec![ident("a"), TokenKind::Dot]);
        assert_tokens("a..", vec![ident("a"), TokenKind::Dot, TokenKind::Dot]);
        assert_tokens("-.", vec![ident("-"), TokenKind::Dot]);
        assert_tokens("-.x", vec![ident("-.x")]);
        assert_tokens(
            "(a. b)",
            vec![
                TokenKind::OpenParen,
                ident("a"),
                TokenKind::Dot,
                ident("b"),
                TokenKind::CloseParen,
            ],
        );
    }

    #[test]
    fn test_sequences_and_whitespace() {
        assert_tokens(
            "(+ 1 -2)",
            vec![
                TokenKind::OpenParen,
                ident("+"),
                TokenKind::Integer(1),
                TokenKind::Integer(-2),
                TokenKind::CloseParen,
            ],
        );
        assert_tokens(
            "\n ( define\tx 10 )\r\n",
            vec![
                TokenKind::OpenParen,
                ident("define"),
                ident("x"),
                TokenKind::Integer(10),
                TokenKind::CloseParen,
            ],
        );
        assert_tokens(
            "'(1 . 2)",
            vec![
                TokenKind::Quote,
                TokenKind::OpenParen,
                TokenKind::Integer(1),
                TokenKind::Dot,
                TokenKind::Integer(2),
                TokenKind::CloseParen,
            ],
        );
    }

    #[test]
    fn test_comments() {
        assert_tokens("; only comment", vec![]);
        assert_tokens(
            "(car x) ; trailing\n; full line\ny",
            vec![
                TokenKind::OpenParen,
                ident("car"),
                ident("x"),
                TokenKind::CloseParen,
                ident("y"),
            ],
        );
    }

    #[test]
    fn test_unrecognized_token() {
        assert_lexer_error("@", LexErrorKind::UnrecognizedToken);
        assert_lexer_error("(foo [bar])", LexErrorKind::UnrecognizedToken);
        assert_lexer_error("\"str\"", LexErrorKind::UnrecognizedToken);
        assert_lexer_error("#x", LexErrorKind::UnrecognizedToken);
    }

    #[test]
    fn test_integer_out_of_range() {
        assert_lexer_error(
            "99999999999999999999",
            LexErrorKind::IntegerOutOfRange("99999999999999999999".to_string()),
        );
    }

    #[test]
    fn test_cursor_peek_and_advance() {
        let mut tokenizer = Tokenizer::new("(a)");
        assert_eq!(tokenizer.peek().unwrap().kind, TokenKind::OpenParen);
        // Peeking does not consume
        assert_eq!(tokenizer.peek().unwrap().kind, TokenKind::OpenParen);
        tokenizer.advance();
        assert_eq!(tokenizer.peek().unwrap().kind, ident("a"));
        tokenizer.advance();
        assert_eq!(tokenizer.peek().unwrap().kind, TokenKind::CloseParen);
        assert!(!tokenizer.at_end());
        tokenizer.advance();
        assert!(tokenizer.at_end());
        tokenizer.advance();
        assert!(tokenizer.at_end());
        assert_eq!(tokenizer.peek().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn test_cursor_reports_error_at_position() {
        let mut tokenizer = Tokenizer::new("a @ b");
        tokenizer.advance();
        let error = tokenizer.peek().unwrap_err();
        assert_eq!(error.kind, LexErrorKind::UnrecognizedToken);
        assert_eq!(error.text, "@");
        assert_eq!(error.span, Span::new(2, 3));
        tokenizer.advance();
        assert_eq!(tokenizer.peek().unwrap().kind, ident("b"));
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("(+ 1)").expect("Should tokenize successfully");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(1, 2));
        assert_eq!(tokens[2].span, Span::new(3, 4));
        assert_eq!(tokens[3].span, Span::new(4, 5));
    }
}
