use crate::error::{Error, Result};
use crate::types::Term;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    // Shared with closures that captured this scope and with child scopes.
    outer: Option<EnvRef>,
    bindings: HashMap<String, Term>,
}

impl Environment {
    /// Creates a new, top-level (global) environment.
    ///
    /// Built-in operations are resolved by the reader, so the global scope
    /// starts out empty.
    pub fn new_global() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Defines a variable in the *current* environment frame.
    /// Replaces the value if the variable already exists in this frame.
    pub fn define(&mut self, name: impl Into<String>, value: Term) {
        self.bindings.insert(name.into(), value);
    }

    /// Looks up a variable's value.
    /// Checks the current environment first, then walks up the outer environment chain.
    pub fn get(&self, name: &str) -> Option<Term> {
        match self.bindings.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .outer
                .as_ref()
                .and_then(|outer_env| outer_env.borrow().get(name)),
        }
    }

    /// Sets the value of an *existing* variable in the environment chain.
    /// Updates the first frame where the variable is found; never creates a binding.
    pub fn set(&mut self, name: &str, value: Term) -> Result<()> {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.outer {
            Some(outer_env) => outer_env.borrow_mut().set(name, value),
            None => Err(Error::undefined(name)),
        }
    }

    /// Gets every identifier visible from this environment
    pub fn identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer_env) = &self.outer {
            identifiers.extend(outer_env.borrow().identifiers());
        }
        identifiers
    }
}
