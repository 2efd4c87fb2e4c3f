use crate::config::InterpreterConfig;
use crate::environment::{EnvRef, Environment};
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::parser::{parse_all, parse_str};
use crate::types::Term;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Nothing is installed unless `RUST_LOG` is
/// set, e.g. `RUST_LOG=schemer=debug` or `RUST_LOG=schemer=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// A read-eval-print session with its own global environment.
///
/// Definitions made by one `run` call are visible to the next.
#[derive(Debug)]
pub struct Interpreter {
    global_env: EnvRef,
    evaluator: Evaluator,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Interpreter {
            global_env: Environment::new_global(),
            evaluator: Evaluator::new(config),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        self.evaluator.config()
    }

    /// Reads exactly one term from `source`, evaluates it in the global
    /// environment and returns its printed form.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn run(&mut self, source: &str) -> Result<String> {
        let term = parse_str(source)?;
        let result = self.eval(&term)?;
        Ok(self.print(&result))
    }

    /// Evaluates every top-level term in `source` in order and returns the
    /// printed form of the last one, or `()` when there are none.
    ///
    /// The whole input is parsed before anything is evaluated, so a syntax
    /// error anywhere means nothing runs.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn run_all(&mut self, source: &str) -> Result<String> {
        let mut result = Term::Empty;
        for term in parse_all(source)? {
            result = self.eval(&term)?;
        }
        Ok(self.print(&result))
    }

    pub fn eval(&mut self, term: &Term) -> Result<Term> {
        self.evaluator.eval(term, &self.global_env)
    }

    pub fn print(&self, term: &Term) -> String {
        term.to_string()
    }

    pub fn global_env(&self) -> EnvRef {
        self.global_env.clone()
    }
}
