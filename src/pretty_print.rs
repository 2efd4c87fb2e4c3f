use crate::{Error, LexError, ParseError};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type ReportSpan = (&'static str, Range<usize>);

const SOURCE_ID: &str = "REPL";

fn whole_input(input: &str) -> Range<usize> {
    0..input.len()
}

fn emit(report: ariadne::ReportBuilder<'static, ReportSpan>, input: &str) -> io::Result<()> {
    report.finish().eprint((SOURCE_ID, Source::from(input)))
}

impl Error {
    /// Writes an annotated report of this error for `input` to stderr.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        let range = whole_input(input);
        let (message, note) = match self {
            Error::Syntax(parse_error) => return parse_error.pretty_print(input),
            Error::Name(message) => (
                format!("NameError: {}", message),
                "This symbol is not defined in the current scope",
            ),
            Error::Runtime(message) => (
                format!("RuntimeError: {}", message),
                "Evaluating this expression failed",
            ),
            Error::RecursionLimit { limit } => (
                format!("FatalError: recursion depth limit of {} exceeded", limit),
                "Evaluation nested too deeply; set SCHEMER_MAX_DEPTH to raise the limit",
            ),
        };
        let report = Report::build(ReportKind::Error, (SOURCE_ID, range.clone()))
            .with_message(message)
            .with_label(Label::new((SOURCE_ID, range)).with_message(note));
        emit(report, input)
    }
}

impl ParseError {
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        let report = match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, (SOURCE_ID, found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new((SOURCE_ID, found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::UnexpectedCloseParen(span) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.to_range()))
                    .with_message("Unexpected ')'")
                    .with_label(
                        Label::new((SOURCE_ID, span.to_range()))
                            .with_message("No list is open here"),
                    )
            }
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                let range = idx.saturating_sub(1)..idx;
                Report::build(ReportKind::Error, (SOURCE_ID, range.clone()))
                    .with_message("Unexpected EOF")
                    .with_label(
                        Label::new((SOURCE_ID, range)).with_message(format!("Expected {expected}")),
                    )
            }
            ParseError::InvalidDotSyntax(span) => {
                Report::build(ReportKind::Error, (SOURCE_ID, span.to_range()))
                    .with_message("Invalid Dot Syntax")
                    .with_label(
                        Label::new((SOURCE_ID, span.to_range()))
                            .with_message("Exactly one term must follow the dot"),
                    )
            }
            ParseError::Lexer(lex_error) => return lex_error.pretty_print(input),
            ParseError::MalformedForm(message) => {
                let range = whole_input(input);
                Report::build(ReportKind::Error, (SOURCE_ID, range.clone()))
                    .with_message(format!("Malformed special form: {}", message))
                    .with_label(
                        Label::new((SOURCE_ID, range))
                            .with_message("This special form is malformed or incomplete"),
                    )
            }
        };
        emit(report, input)
    }
}

impl LexError {
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        let report = Report::build(ReportKind::Error, (SOURCE_ID, self.span.to_range()))
            .with_message("Lexer Error")
            .with_label(
                Label::new((SOURCE_ID, self.span.to_range())).with_message(self.kind.to_string()),
            );
        emit(report, input)
    }
}
