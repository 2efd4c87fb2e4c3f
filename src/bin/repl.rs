use std::borrow::Cow;

use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use schemer::{Builtin, EnvRef, Interpreter, InterpreterConfig, Token, TokenKind, init_tracing, tokenize};

const HISTORY_FILE: &str = "schemer_history.txt";

struct SchemerCompleter {
    env: EnvRef,
}

impl SchemerCompleter {
    fn new(env: EnvRef) -> Self {
        SchemerCompleter { env }
    }

    fn candidates(&self, prefix: &str) -> Vec<String> {
        let mut names = self.env.borrow().identifiers();
        names.extend(Builtin::ALL.iter().map(|builtin| builtin.name().to_string()));
        let mut suffixes: Vec<String> = names
            .iter()
            .filter_map(|name| name.strip_prefix(prefix))
            .filter(|suffix| !suffix.is_empty())
            .map(str::to_string)
            .collect();
        suffixes.sort();
        suffixes
    }
}

impl rustyline::completion::Completer for SchemerCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let candidates = match tokenize(&line[..pos]) {
            Ok(tokens) => match tokens.last() {
                // Only complete when the cursor touches the identifier
                Some(Token {
                    kind: TokenKind::Identifier(prefix),
                    span,
                }) if span.end == pos => self.candidates(prefix),
                _ => vec![],
            },
            Err(_) => vec![],
        };
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: SchemerValidator,
    #[rustyline(Highlighter)]
    highlighter: SchemerHighlighter,
    #[rustyline(Completer)]
    completer: SchemerCompleter,
}

struct SchemerValidator;

impl Validator for SchemerValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        for (i, c) in code_chars(ctx.input()) {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => {
                    return Ok(ValidationResult::Invalid(Some(format!(
                        "  - Unmatched ')' at position {}",
                        i
                    ))));
                }
                ')' => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

// Characters outside `;` comments, with their positions.
fn code_chars(input: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut in_comment = false;
    input.chars().enumerate().filter(move |&(_, c)| {
        if c == '\n' || c == '\r' {
            in_comment = false;
        } else if c == ';' {
            in_comment = true;
        }
        !in_comment
    })
}

struct SchemerHighlighter;

impl Highlighter for SchemerHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_comment = false;
        let cursor = pos.checked_sub(1);

        for (i, c) in line.chars().enumerate() {
            if c == '\n' {
                in_comment = false;
            }
            if in_comment || c == ';' {
                in_comment = true;
                highlighted.push_str(&format!("\x1b[90m{}\x1b[0m", c)); // Grey for comments
                continue;
            }

            match c {
                '(' => {
                    stack.push((i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' => {
                    if let Some((open_index, matching_pos)) = stack.pop() {
                        if cursor == Some(open_index) || cursor == Some(i) {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching parens
                            highlighted
                                .replace_range(matching_pos..=matching_pos, "\x1b[1;34m(\x1b[0m");
                        } else {
                            highlighted.push(c);
                        }
                    } else {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched parens
                    }
                }
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    println!("Schemer REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let mut interpreter = Interpreter::with_config(InterpreterConfig::from_env());
    let h = InputValidator {
        highlighter: SchemerHighlighter,
        validator: SchemerValidator,
        completer: SchemerCompleter::new(interpreter.global_env()),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(rustyline::EditMode::Vi)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("schemer> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match interpreter.run_all(input) {
                    Ok(output) => println!("{}", output),
                    Err(e) => {
                        if e.pretty_print(input).is_err() {
                            eprintln!("{}", e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}
