use crate::config::InterpreterConfig;
use crate::environment::{EnvRef, Environment};
use crate::error::{Error, Result};
use crate::primitives::{self, check_arity};
use crate::stack::ensure_sufficient_stack;
use crate::types::{Builtin, Closure, Symbol, Term};
use std::rc::Rc;
use tracing::{debug, trace};

// Result type alias for convenience
pub type EvalResult<T = Term> = Result<T>;

/// Tree-walking evaluator.
///
/// Tracks how deeply `eval` calls are nested so that runaway recursion in
/// user code ends in [`Error::RecursionLimit`] instead of exhausting memory.
#[derive(Debug, Default)]
pub struct Evaluator {
    config: InterpreterConfig,
    depth: usize,
}

/// Evaluates `term` in `env` with the default configuration.
pub fn evaluate(term: &Term, env: &EnvRef) -> EvalResult {
    Evaluator::default().eval(term, env)
}

impl Evaluator {
    pub fn new(config: InterpreterConfig) -> Self {
        Evaluator { config, depth: 0 }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn eval(&mut self, term: &Term, env: &EnvRef) -> EvalResult {
        if self.depth >= self.config.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.eval_term(term, env));
        self.depth -= 1;
        result
    }

    fn eval_term(&mut self, term: &Term, env: &EnvRef) -> EvalResult {
        match term {
            Term::Empty => Err(Error::runtime("cannot evaluate empty list")),
            Term::Number(_) | Term::Boolean(_) | Term::Closure(_) => Ok(term.clone()),
            Term::Symbol(symbol) => lookup(symbol, env),
            Term::Pair(pair) => {
                let (operator, operands) = {
                    let pair = pair.borrow();
                    (pair.first.clone(), pair.second.clone())
                };
                let procedure = self.eval(&operator, env)?;
                self.apply(&procedure, &operands, env)
            }
        }
    }

    /// Applies an evaluated procedure to the unevaluated argument list `args`.
    pub fn apply(&mut self, procedure: &Term, args: &Term, env: &EnvRef) -> EvalResult {
        match procedure {
            Term::Symbol(Symbol::Builtin(builtin)) => self.apply_builtin(*builtin, args, env),
            Term::Closure(closure) => self.apply_closure(closure, args, env),
            _ => Err(Error::runtime("first element is not a function")),
        }
    }

    fn apply_builtin(&mut self, builtin: Builtin, args: &Term, env: &EnvRef) -> EvalResult {
        trace!(builtin = builtin.name(), "apply builtin");
        let Some(operands) = args.to_vec() else {
            return Err(if builtin.is_special_form() {
                Error::malformed(format!("{} expects a proper list of operands", builtin.name()))
            } else {
                Error::runtime(format!("invalid arguments to {}", builtin.name()))
            });
        };

        match builtin {
            Builtin::Quote => self.eval_quote(&operands),
            Builtin::If => self.eval_if(&operands, env),
            Builtin::Define => self.eval_define(&operands, env),
            Builtin::Set => self.eval_set(&operands, env),
            Builtin::Lambda => self.eval_lambda(&operands, env),
            Builtin::And => self.eval_and(&operands, env),
            Builtin::Or => self.eval_or(&operands, env),
            procedure => {
                check_arity(procedure, operands.len())?;
                let values = operands
                    .iter()
                    .map(|operand| self.eval(operand, env))
                    .collect::<EvalResult<Vec<_>>>()?;
                primitives::call(procedure, &values)
            }
        }
    }

    fn apply_closure(&mut self, closure: &Rc<Closure>, args: &Term, env: &EnvRef) -> EvalResult {
        let name = closure.name.as_deref().unwrap_or("lambda");
        let operands = args
            .to_vec()
            .ok_or_else(|| Error::runtime(format!("invalid arguments to {}", name)))?;
        if operands.len() != closure.params.len() {
            return Err(Error::runtime(format!(
                "{} expects {} arguments, got {}",
                name,
                closure.params.len(),
                operands.len()
            )));
        }
        trace!(procedure = name, argc = operands.len(), "apply closure");

        // Arguments are evaluated in the caller's environment, bound in a
        // fresh frame on top of the captured one.
        let frame = Environment::new_enclosed(closure.env.clone());
        for (param, operand) in closure.params.iter().zip(&operands) {
            let value = self.eval(operand, env)?;
            frame.borrow_mut().define(param.clone(), value);
        }

        let mut result = Term::Empty;
        for expr in &closure.body {
            result = self.eval(expr, &frame)?;
        }
        Ok(result)
    }

    // --- Special forms ---

    fn eval_quote(&mut self, operands: &[Term]) -> EvalResult {
        match operands {
            [quoted] => Ok(quoted.clone()),
            _ => Err(Error::malformed("quote takes exactly one argument")),
        }
    }

    fn eval_if(&mut self, operands: &[Term], env: &EnvRef) -> EvalResult {
        if let [condition, consequent, maybe_alternate @ ..] = operands
            && maybe_alternate.len() <= 1
        {
            match self.eval(condition, env)? {
                Term::Boolean(true) => self.eval(consequent, env),
                Term::Boolean(false) => match maybe_alternate {
                    [alternate] => self.eval(alternate, env),
                    _ => Ok(Term::Empty),
                },
                _ => Err(Error::runtime("condition is not boolean")),
            }
        } else {
            Err(Error::malformed("if expects two or three arguments"))
        }
    }

    fn eval_define(&mut self, operands: &[Term], env: &EnvRef) -> EvalResult {
        match operands {
            [Term::Symbol(target), value_expr] => {
                let name = target.name();
                let value = self.eval(value_expr, env)?;
                if let Term::Symbol(symbol) = &value
                    && symbol.name() == name
                    && env.borrow().get(name).is_some()
                {
                    return Err(Error::Name(format!(
                        "cannot assign variable {} to itself",
                        name
                    )));
                }
                debug!(name, "define");
                env.borrow_mut().define(name, value);
                Ok(Term::Empty)
            }
            [Term::Symbol(_), ..] => Err(Error::malformed(
                "define expects exactly one value expression",
            )),
            [Term::Pair(signature), body @ ..] if !body.is_empty() => {
                let (head, params) = {
                    let signature = signature.borrow();
                    (signature.first.clone(), signature.second.clone())
                };
                let Term::Symbol(name) = head else {
                    return Err(Error::runtime("define: procedure name is not a symbol"));
                };
                let name = name.name().to_string();
                let closure = Closure {
                    name: Some(name.clone()),
                    params: parse_params(&params)?,
                    body: body.to_vec(),
                    env: env.clone(),
                };
                debug!(name = name.as_str(), "define procedure");
                env.borrow_mut()
                    .define(name, Term::Closure(Rc::new(closure)));
                Ok(Term::Empty)
            }
            [Term::Pair(_)] => Err(Error::malformed("define expects a procedure body")),
            _ => Err(Error::malformed(
                "define expects a name or (name params...) followed by a body",
            )),
        }
    }

    fn eval_set(&mut self, operands: &[Term], env: &EnvRef) -> EvalResult {
        match operands {
            [Term::Symbol(Symbol::Identifier(name)), value_expr] => {
                let value = self.eval(value_expr, env)?;
                debug!(name = name.as_str(), "set!");
                env.borrow_mut().set(name, value)?;
                Ok(Term::Empty)
            }
            [target, _] => Err(Error::runtime(format!(
                "set! target {} is not a variable",
                target
            ))),
            _ => Err(Error::malformed("set! expects exactly two arguments")),
        }
    }

    fn eval_lambda(&mut self, operands: &[Term], env: &EnvRef) -> EvalResult {
        match operands {
            [params, body @ ..] if !body.is_empty() => Ok(Term::Closure(Rc::new(Closure {
                name: None,
                params: parse_params(params)?,
                body: body.to_vec(),
                env: env.clone(),
            }))),
            _ => Err(Error::malformed(
                "lambda expects a parameter list and at least one body expression",
            )),
        }
    }

    // Stops at the first #f and returns it, otherwise yields the last value.
    fn eval_and(&mut self, operands: &[Term], env: &EnvRef) -> EvalResult {
        let mut result = Term::Boolean(true);
        for operand in operands {
            result = self.eval(operand, env)?;
            if result.is_false() {
                break;
            }
        }
        Ok(result)
    }

    // Stops at the first value that is not #f and returns it.
    fn eval_or(&mut self, operands: &[Term], env: &EnvRef) -> EvalResult {
        for operand in operands {
            let value = self.eval(operand, env)?;
            if !value.is_false() {
                return Ok(value);
            }
        }
        Ok(Term::Boolean(false))
    }
}

/// Environment bindings win over built-ins, so `(define car ...)` shadows `car`.
fn lookup(symbol: &Symbol, env: &EnvRef) -> EvalResult {
    if let Some(value) = env.borrow().get(symbol.name()) {
        return Ok(value);
    }
    match symbol {
        Symbol::Builtin(_) => Ok(Term::Symbol(symbol.clone())),
        Symbol::Identifier(name) => Err(Error::undefined(name)),
    }
}

fn parse_params(params: &Term) -> EvalResult<Vec<String>> {
    let params = params
        .to_vec()
        .ok_or_else(|| Error::malformed("parameter list must be a proper list"))?;
    params
        .iter()
        .map(|param| match param {
            Term::Symbol(Symbol::Identifier(name)) => Ok(name.clone()),
            other => Err(Error::runtime(format!(
                "lambda parameter {} is not a variable",
                other
            ))),
        })
        .collect()
}
