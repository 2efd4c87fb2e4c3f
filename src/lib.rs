// Declare modules publicly so they are part of the library interface
pub mod config;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod source;
mod stack;
pub mod types;

pub use config::InterpreterConfig;
pub use environment::{EnvRef, Environment};
pub use error::{Error, ErrorKind, Result};
pub use evaluator::{EvalResult, Evaluator, evaluate};
pub use interpreter::{Interpreter, init_tracing};
pub use lexer::{LexError, LexErrorKind, Token, TokenKind, Tokenizer, tokenize};
pub use parser::{ParseError, parse_all, parse_str};
pub use source::Span;
pub use types::{Builtin, Closure, Symbol, Term};

/// Evaluates exactly one term in a fresh session and returns its printed form.
pub fn run(source: &str) -> Result<String> {
    Interpreter::new().run(source)
}

/// Renders a term the way the REPL shows results.
pub fn print(term: &Term) -> String {
    term.to_string()
}
