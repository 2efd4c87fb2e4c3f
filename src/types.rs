use crate::environment::EnvRef;
use crate::stack::ensure_sufficient_stack;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Represents any Scheme datum: code read by the parser and values produced by evaluation.
#[derive(Debug, Clone)]
pub enum Term {
    Number(i64),
    Boolean(bool),
    Symbol(Symbol),
    Pair(PairRef),
    Empty, // Represents the empty list '() and "no value"
    Closure(Rc<Closure>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// One of the fixed built-in operations, resolved at read time.
    Builtin(Builtin),
    /// Any other identifier, resolved against the environment when evaluated.
    Identifier(String),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Builtin(builtin) => builtin.name(),
            Symbol::Identifier(name) => name,
        }
    }
}

/// A cons cell. Shared through `PairRef` so that `set-car!`/`set-cdr!`
/// are observed by every alias of the same cell.
#[derive(Debug, Clone)]
pub struct Pair {
    pub first: Term,
    pub second: Term,
}

pub type PairRef = Rc<RefCell<Pair>>;

// Long or deeply nested lists would otherwise be freed recursively, one
// native frame per cell. Uniquely owned cells are unlinked onto a work list
// instead, so each one is dropped with empty fields.
impl Drop for Pair {
    fn drop(&mut self) {
        if !matches!(self.first, Term::Pair(_)) && !matches!(self.second, Term::Pair(_)) {
            return;
        }
        let mut pending = vec![
            mem::replace(&mut self.first, Term::Empty),
            mem::replace(&mut self.second, Term::Empty),
        ];
        while let Some(term) = pending.pop() {
            if let Term::Pair(pair) = term
                && let Ok(cell) = Rc::try_unwrap(pair)
            {
                let mut cell = cell.into_inner();
                pending.push(mem::replace(&mut cell.first, Term::Empty));
                pending.push(mem::replace(&mut cell.second, Term::Empty));
            }
        }
    }
}

// Walks the cdr chain in a loop; only car nesting recurses.
fn pairs_equal(a: &PairRef, b: &PairRef) -> bool {
    let (mut a, mut b) = (a.clone(), b.clone());
    loop {
        if Rc::ptr_eq(&a, &b) {
            return true;
        }
        let (next_a, next_b) = {
            let (left, right) = (a.borrow(), b.borrow());
            if !ensure_sufficient_stack(|| left.first == right.first) {
                return false;
            }
            match (&left.second, &right.second) {
                (Term::Pair(next_a), Term::Pair(next_b)) => (next_a.clone(), next_b.clone()),
                (left_tail, right_tail) => return left_tail == right_tail,
            }
        };
        a = next_a;
        b = next_b;
    }
}

/// A user-defined procedure created by `lambda` or `(define (name ...) ...)`.
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Term>,
    pub env: EnvRef,
}

// The captured environment may contain this closure, so Debug stays shallow.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

macro_rules! builtins {
    ($($variant:ident => $name:literal, $special:literal;)+) => {
        /// The closed set of built-in operations recognised by the reader.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $($variant,)+
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $name,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Builtin> {
                match name {
                    $($name => Some(Builtin::$variant),)+
                    _ => None,
                }
            }

            /// Special forms receive their arguments unevaluated and decide
            /// themselves what to evaluate.
            pub fn is_special_form(self) -> bool {
                match self {
                    $(Builtin::$variant => $special,)+
                }
            }
        }
    };
}

builtins! {
    Quote => "quote", true;
    IsNumber => "number?", false;
    NumEq => "=", false;
    Greater => ">", false;
    Less => "<", false;
    GreaterEq => ">=", false;
    LessEq => "<=", false;
    Add => "+", false;
    Sub => "-", false;
    Mul => "*", false;
    Div => "/", false;
    Max => "max", false;
    Min => "min", false;
    Abs => "abs", false;
    IsBoolean => "boolean?", false;
    Not => "not", false;
    And => "and", true;
    Or => "or", true;
    IsPair => "pair?", false;
    IsNull => "null?", false;
    IsList => "list?", false;
    Cons => "cons", false;
    Car => "car", false;
    Cdr => "cdr", false;
    List => "list", false;
    ListRef => "list-ref", false;
    ListTail => "list-tail", false;
    If => "if", true;
    Define => "define", true;
    Set => "set!", true;
    SetCar => "set-car!", false;
    SetCdr => "set-cdr!", false;
    IsSymbol => "symbol?", false;
    Lambda => "lambda", true;
}

impl Term {
    pub fn new_pair(first: Term, second: Term) -> Self {
        Term::Pair(Rc::new(RefCell::new(Pair { first, second })))
    }

    pub fn new_identifier(name: impl Into<String>) -> Self {
        Term::Symbol(Symbol::Identifier(name.into()))
    }

    pub fn new_builtin(builtin: Builtin) -> Self {
        Term::Symbol(Symbol::Builtin(builtin))
    }

    /// Builds a proper list from the given items.
    pub fn list(items: impl IntoIterator<Item = Term, IntoIter: DoubleEndedIterator>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(Term::Empty, |tail, item| Term::new_pair(item, tail))
    }

    /// `(quote inner)`
    pub fn new_quote(inner: Term) -> Self {
        Term::list([Term::new_builtin(Builtin::Quote), inner])
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Term::Number(_) => "number",
            Term::Boolean(_) => "boolean",
            Term::Symbol(_) => "symbol",
            Term::Pair(_) => "pair",
            Term::Empty => "empty list",
            Term::Closure(_) => "procedure",
        }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Term::Boolean(false))
    }

    /// Collects the elements of a proper list. Returns `None` for dotted
    /// tails and for non-list terms.
    pub fn to_vec(&self) -> Option<Vec<Term>> {
        let mut items = Vec::new();
        let mut current = self.clone();
        loop {
            let next = match &current {
                Term::Empty => return Some(items),
                Term::Pair(pair) => {
                    let pair = pair.borrow();
                    items.push(pair.first.clone());
                    pair.second.clone()
                }
                _ => return None,
            };
            current = next;
        }
    }

    pub fn is_proper_list(&self) -> bool {
        let mut current = self.clone();
        loop {
            let next = match &current {
                Term::Empty => return true,
                Term::Pair(pair) => pair.borrow().second.clone(),
                _ => return false,
            };
            current = next;
        }
    }
}

// Pairs compare structurally, closures by identity.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Number(a), Term::Number(b)) => a == b,
            (Term::Boolean(a), Term::Boolean(b)) => a == b,
            (Term::Symbol(a), Term::Symbol(b)) => a == b,
            (Term::Pair(a), Term::Pair(b)) => pairs_equal(a, b),
            (Term::Empty, Term::Empty) => true,
            (Term::Closure(a), Term::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Number(n) => write!(f, "{}", n),
            Term::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Term::Symbol(symbol) => write!(f, "{}", symbol),
            Term::Empty => write!(f, "()"),
            Term::Closure(closure) => match &closure.name {
                Some(name) => write!(f, "#<procedure {}>", name),
                None => write!(f, "#<procedure>"),
            },
            Term::Pair(pair) => {
                write!(f, "(")?;
                let mut current = pair.clone();
                loop {
                    let next = {
                        let cell = current.borrow();
                        ensure_sufficient_stack(|| write!(f, "{}", cell.first))?;
                        match &cell.second {
                            Term::Empty => None,
                            Term::Pair(next) => Some(next.clone()),
                            tail => {
                                write!(f, " . {}", tail)?;
                                None
                            }
                        }
                    };
                    match next {
                        Some(next) => {
                            write!(f, " ")?;
                            current = next;
                        }
                        None => break,
                    }
                }
                write!(f, ")")
            }
        }
    }
}
