use crate::error::{Error, Result};
use crate::evaluator::EvalResult;
use crate::types::{Builtin, Term};

/// Number of arguments a built-in procedure accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(expected) => count == expected,
            Arity::AtLeast(min) => count >= min,
            Arity::Any => true,
        }
    }
}

/// Special forms validate their own shape, so they report [`Arity::Any`].
pub fn arity(builtin: Builtin) -> Arity {
    use Builtin::*;
    match builtin {
        IsNumber | IsBoolean | IsPair | IsNull | IsList | IsSymbol | Not | Abs | Car | Cdr => {
            Arity::Exactly(1)
        }
        Cons | ListRef | ListTail | SetCar | SetCdr => Arity::Exactly(2),
        Sub | Div | Max | Min => Arity::AtLeast(1),
        NumEq | Greater | Less | GreaterEq | LessEq | Add | Mul | List => Arity::Any,
        Quote | And | Or | If | Define | Set | Lambda => Arity::Any,
    }
}

/// Fails unless `builtin` accepts `count` arguments.
pub fn check_arity(builtin: Builtin, count: usize) -> Result<()> {
    let arity = arity(builtin);
    if arity.accepts(count) {
        return Ok(());
    }
    let expected = match arity {
        Arity::Exactly(1) => "exactly 1 argument".to_string(),
        Arity::Exactly(n) => format!("exactly {} arguments", n),
        Arity::AtLeast(1) => "at least 1 argument".to_string(),
        Arity::AtLeast(n) => format!("at least {} arguments", n),
        Arity::Any => "any number of arguments".to_string(),
    };
    Err(Error::runtime(format!(
        "{} expects {}, got {}",
        builtin.name(),
        expected,
        count
    )))
}

// Extracts a number from a Term or returns a runtime error naming the
// offending argument
macro_rules! expect_number {
    ($term:expr, $name:expr, $arg_pos:expr) => {
        match $term {
            Term::Number(n) => *n,
            other => {
                return Err(Error::runtime(format!(
                    "{} expects a number for argument {}, got {}",
                    $name,
                    $arg_pos,
                    other.type_name()
                )));
            }
        }
    };
}

fn numbers(args: &[Term], name: &str) -> Result<Vec<i64>> {
    let mut values = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        values.push(expect_number!(arg, name, index + 1));
    }
    Ok(values)
}

fn overflow() -> Error {
    Error::runtime("integer overflow")
}

fn division_by_zero() -> Error {
    Error::runtime("division by zero")
}

fn fold_numbers(
    args: &[Term],
    name: &str,
    start: i64,
    func: fn(i64, i64) -> Option<i64>,
) -> EvalResult {
    numbers(args, name)?
        .into_iter()
        .try_fold(start, |acc, value| func(acc, value).ok_or_else(overflow))
        .map(Term::Number)
}

fn compare_numbers(args: &[Term], name: &str, compare: fn(i64, i64) -> bool) -> EvalResult {
    // Every argument is type-checked before any comparison runs
    let values = numbers(args, name)?;
    Ok(Term::Boolean(
        values.windows(2).all(|pair| compare(pair[0], pair[1])),
    ))
}

/// Calls a built-in procedure with already-evaluated arguments.
///
/// The evaluator checks arity before evaluating any argument; the count is
/// checked again here so that direct callers get an error, never a panic.
pub fn call(builtin: Builtin, args: &[Term]) -> EvalResult {
    use Builtin::*;
    check_arity(builtin, args.len())?;
    let name = builtin.name();
    match builtin {
        // --- Arithmetic ---
        Add => fold_numbers(args, name, 0, i64::checked_add),
        Mul => fold_numbers(args, name, 1, i64::checked_mul),
        Sub => match args {
            [only] => expect_number!(only, name, 1)
                .checked_neg()
                .map(Term::Number)
                .ok_or_else(overflow),
            [first, rest @ ..] => {
                let start = expect_number!(first, name, 1);
                fold_numbers(rest, name, start, i64::checked_sub)
            }
            [] => check_arity(builtin, 0).map(|_| Term::Empty),
        },
        Div => prim_div(args),
        Max => Ok(Term::Number(
            numbers(args, name)?.into_iter().max().unwrap_or_default(),
        )),
        Min => Ok(Term::Number(
            numbers(args, name)?.into_iter().min().unwrap_or_default(),
        )),
        Abs => expect_number!(&args[0], name, 1)
            .checked_abs()
            .map(Term::Number)
            .ok_or_else(overflow),

        // --- Comparison ---
        NumEq => compare_numbers(args, name, |left, right| left == right),
        Less => compare_numbers(args, name, |left, right| left < right),
        LessEq => compare_numbers(args, name, |left, right| left <= right),
        Greater => compare_numbers(args, name, |left, right| left > right),
        GreaterEq => compare_numbers(args, name, |left, right| left >= right),

        // --- Type predicates ---
        IsNumber => Ok(Term::Boolean(matches!(args[0], Term::Number(_)))),
        IsBoolean => Ok(Term::Boolean(matches!(args[0], Term::Boolean(_)))),
        IsSymbol => Ok(Term::Boolean(matches!(args[0], Term::Symbol(_)))),
        IsPair => Ok(Term::Boolean(matches!(args[0], Term::Pair(_)))),
        IsNull => Ok(Term::Boolean(matches!(args[0], Term::Empty))),
        IsList => Ok(Term::Boolean(args[0].is_proper_list())),
        Not => Ok(Term::Boolean(args[0].is_false())),

        // --- Lists ---
        Cons => Ok(Term::new_pair(args[0].clone(), args[1].clone())),
        Car => match &args[0] {
            Term::Pair(pair) => Ok(pair.borrow().first.clone()),
            other => Err(expects_pair(name, other)),
        },
        Cdr => match &args[0] {
            Term::Pair(pair) => Ok(pair.borrow().second.clone()),
            other => Err(expects_pair(name, other)),
        },
        List => Ok(Term::list(args.iter().cloned())),
        ListTail => {
            let index = expect_index(&args[1], name)?;
            list_tail(&args[0], index, name)
        }
        ListRef => {
            let index = expect_index(&args[1], name)?;
            match list_tail(&args[0], index, name)? {
                Term::Pair(pair) => Ok(pair.borrow().first.clone()),
                _ => Err(Error::runtime(format!("{}: index {} out of range", name, index))),
            }
        }
        SetCar => match &args[0] {
            Term::Pair(pair) => {
                pair.borrow_mut().first = args[1].clone();
                Ok(Term::Empty)
            }
            other => Err(expects_pair(name, other)),
        },
        SetCdr => match &args[0] {
            Term::Pair(pair) => {
                pair.borrow_mut().second = args[1].clone();
                Ok(Term::Empty)
            }
            other => Err(expects_pair(name, other)),
        },

        Quote | And | Or | If | Define | Set | Lambda => Err(Error::runtime(format!(
            "{} is a special form, not a procedure",
            name
        ))),
    }
}

fn prim_div(args: &[Term]) -> EvalResult {
    // (/ x) -> 1 / x, truncated towards zero
    // (/ x y z) -> x / y / z
    let values = numbers(args, "/")?;
    match values.as_slice() {
        [0] => Err(division_by_zero()),
        [only] => Ok(Term::Number(1 / only)),
        [first, rest @ ..] => {
            if rest.contains(&0) {
                return Err(division_by_zero());
            }
            rest.iter()
                .try_fold(*first, |acc, value| acc.checked_div(*value).ok_or_else(overflow))
                .map(Term::Number)
        }
        [] => Err(Error::runtime("/ expects at least 1 argument, got 0")),
    }
}

fn expects_pair(name: &str, found: &Term) -> Error {
    Error::runtime(format!("{} expects a pair, got {}", name, found.type_name()))
}

fn expect_index(term: &Term, name: &str) -> Result<usize> {
    let index = expect_number!(term, name, 2);
    usize::try_from(index)
        .map_err(|_| Error::runtime(format!("{}: index {} is negative", name, index)))
}

// Follows `index` cdr links from `list`.
fn list_tail(list: &Term, index: usize, name: &str) -> EvalResult {
    let mut current = list.clone();
    for _ in 0..index {
        let next = match &current {
            Term::Pair(pair) => pair.borrow().second.clone(),
            _ => {
                return Err(Error::runtime(format!(
                    "{}: index {} out of range",
                    name, index
                )));
            }
        };
        current = next;
    }
    Ok(current)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn num(n: i64) -> Term {
        Term::Number(n)
    }

    fn nums(values: &[i64]) -> Vec<Term> {
        values.iter().copied().map(num).collect()
    }

    // Checks arity the way the evaluator does, then calls
    fn apply(builtin: Builtin, args: &[Term]) -> EvalResult {
        check_arity(builtin, args.len())?;
        call(builtin, args)
    }

    fn assert_call(builtin: Builtin, args: &[Term], expected: &str) {
        match apply(builtin, args) {
            Ok(result) => assert_eq!(result.to_string(), expected, "{}", builtin.name()),
            Err(e) => panic!("{} failed: {}", builtin.name(), e),
        }
    }

    fn assert_runtime_error(builtin: Builtin, args: &[Term]) {
        match apply(builtin, args) {
            Ok(result) => panic!("Expected {} to fail, got {}", builtin.name(), result),
            Err(e) => assert_eq!(e.kind(), ErrorKind::Runtime, "{}", e),
        }
    }

    #[test]
    fn test_add_and_mul() {
        assert_call(Builtin::Add, &[], "0");
        assert_call(Builtin::Add, &nums(&[1, 2, 3]), "6");
        assert_call(Builtin::Mul, &[], "1");
        assert_call(Builtin::Mul, &nums(&[2, 3, 4]), "24");
        assert_runtime_error(Builtin::Add, &[num(1), Term::Boolean(true)]);
    }

    #[test]
    fn test_sub() {
        assert_call(Builtin::Sub, &nums(&[5]), "-5");
        assert_call(Builtin::Sub, &nums(&[10, 3, 2]), "5");
        assert_runtime_error(Builtin::Sub, &[]);
    }

    #[test]
    fn test_div() {
        assert_call(Builtin::Div, &nums(&[7, 2]), "3");
        assert_call(Builtin::Div, &nums(&[-7, 2]), "-3");
        assert_call(Builtin::Div, &nums(&[100, 5, 2]), "10");
        assert_call(Builtin::Div, &nums(&[1]), "1");
        assert_call(Builtin::Div, &nums(&[3]), "0");
        assert_runtime_error(Builtin::Div, &nums(&[0]));
        assert_runtime_error(Builtin::Div, &nums(&[1, 0]));
        assert_runtime_error(Builtin::Div, &[]);
    }

    #[test]
    fn test_overflow() {
        assert_runtime_error(Builtin::Add, &nums(&[i64::MAX, 1]));
        assert_runtime_error(Builtin::Mul, &nums(&[i64::MAX, 2]));
        assert_runtime_error(Builtin::Sub, &nums(&[i64::MIN]));
        assert_runtime_error(Builtin::Div, &nums(&[i64::MIN, -1]));
        assert_runtime_error(Builtin::Abs, &nums(&[i64::MIN]));
    }

    #[test]
    fn test_max_min_abs() {
        assert_call(Builtin::Max, &nums(&[3, 9, -2]), "9");
        assert_call(Builtin::Min, &nums(&[3, 9, -2]), "-2");
        assert_call(Builtin::Max, &nums(&[4]), "4");
        assert_call(Builtin::Abs, &nums(&[-8]), "8");
        assert_runtime_error(Builtin::Max, &[]);
        assert_runtime_error(Builtin::Min, &[Term::Empty]);
        assert_runtime_error(Builtin::Abs, &nums(&[1, 2]));
    }

    #[test]
    fn test_comparisons() {
        assert_call(Builtin::NumEq, &nums(&[1, 1, 1]), "#t");
        assert_call(Builtin::NumEq, &nums(&[1, 2]), "#f");
        assert_call(Builtin::Less, &nums(&[1, 2, 3]), "#t");
        assert_call(Builtin::Less, &nums(&[1, 3, 2]), "#f");
        assert_call(Builtin::LessEq, &nums(&[1, 1, 2]), "#t");
        assert_call(Builtin::Greater, &nums(&[3, 2, 1]), "#t");
        assert_call(Builtin::GreaterEq, &nums(&[3, 3, 4]), "#f");
        // Vacuously true with fewer than two arguments
        assert_call(Builtin::Less, &[], "#t");
        assert_call(Builtin::Greater, &nums(&[5]), "#t");
    }

    #[test]
    fn test_comparison_checks_all_types() {
        // Already false after the first pair, but the boolean is still rejected
        assert_runtime_error(Builtin::Less, &[num(2), num(1), Term::Boolean(true)]);
    }

    #[test]
    fn test_predicates() {
        let pair = Term::new_pair(num(1), num(2));
        let list = Term::list(nums(&[1, 2]));
        assert_call(Builtin::IsNumber, &[num(1)], "#t");
        assert_call(Builtin::IsNumber, &[Term::Boolean(true)], "#f");
        assert_call(Builtin::IsBoolean, &[Term::Boolean(false)], "#t");
        assert_call(Builtin::IsSymbol, &[Term::new_identifier("a")], "#t");
        assert_call(Builtin::IsSymbol, &[Term::new_builtin(Builtin::Car)], "#t");
        assert_call(Builtin::IsSymbol, &[num(1)], "#f");
        assert_call(Builtin::IsPair, &[pair.clone()], "#t");
        assert_call(Builtin::IsPair, &[Term::Empty], "#f");
        assert_call(Builtin::IsNull, &[Term::Empty], "#t");
        assert_call(Builtin::IsNull, &[list.clone()], "#f");
        assert_call(Builtin::IsList, &[list], "#t");
        assert_call(Builtin::IsList, &[Term::Empty], "#t");
        assert_call(Builtin::IsList, &[pair], "#f");
        assert_runtime_error(Builtin::IsNumber, &[]);
    }

    #[test]
    fn test_not() {
        assert_call(Builtin::Not, &[Term::Boolean(false)], "#t");
        assert_call(Builtin::Not, &[Term::Boolean(true)], "#f");
        assert_call(Builtin::Not, &[num(0)], "#f");
        assert_call(Builtin::Not, &[Term::Empty], "#f");
    }

    #[test]
    fn test_cons_car_cdr() {
        assert_call(Builtin::Cons, &nums(&[1, 2]), "(1 . 2)");
        assert_call(Builtin::Cons, &[num(1), Term::Empty], "(1)");
        let list = Term::list(nums(&[1, 2, 3]));
        assert_call(Builtin::Car, &[list.clone()], "1");
        assert_call(Builtin::Cdr, &[list], "(2 3)");
        assert_runtime_error(Builtin::Car, &[Term::Empty]);
        assert_runtime_error(Builtin::Cdr, &[num(1)]);
        assert_runtime_error(Builtin::Cons, &nums(&[1]));
    }

    #[test]
    fn test_list() {
        assert_call(Builtin::List, &[], "()");
        assert_call(Builtin::List, &nums(&[1, 2, 3]), "(1 2 3)");
    }

    #[test]
    fn test_list_ref_and_tail() {
        let list = Term::list(nums(&[10, 20, 30]));
        assert_call(Builtin::ListRef, &[list.clone(), num(0)], "10");
        assert_call(Builtin::ListRef, &[list.clone(), num(2)], "30");
        assert_call(Builtin::ListTail, &[list.clone(), num(1)], "(20 30)");
        assert_call(Builtin::ListTail, &[list.clone(), num(3)], "()");
        assert_runtime_error(Builtin::ListRef, &[list.clone(), num(3)]);
        assert_runtime_error(Builtin::ListRef, &[list.clone(), num(-1)]);
        assert_runtime_error(Builtin::ListTail, &[list.clone(), num(4)]);
        assert_runtime_error(Builtin::ListRef, &[list, Term::Boolean(true)]);
    }

    #[test]
    fn test_set_car_cdr() {
        let pair = Term::new_pair(num(1), num(2));
        let alias = pair.clone();
        assert_call(Builtin::SetCar, &[pair.clone(), num(10)], "()");
        assert_call(Builtin::SetCdr, &[pair, Term::Empty], "()");
        assert_eq!(alias.to_string(), "(10)");
        assert_runtime_error(Builtin::SetCar, &[num(1), num(2)]);
        assert_runtime_error(Builtin::SetCdr, &[Term::Empty, num(2)]);
    }

    #[test]
    fn test_arity_table() {
        assert_eq!(arity(Builtin::Car), Arity::Exactly(1));
        assert_eq!(arity(Builtin::Cons), Arity::Exactly(2));
        assert_eq!(arity(Builtin::Sub), Arity::AtLeast(1));
        assert_eq!(arity(Builtin::Add), Arity::Any);
        assert_eq!(
            check_arity(Builtin::Car, 2).unwrap_err().to_string(),
            "RuntimeError: car expects exactly 1 argument, got 2"
        );
    }

    #[test]
    fn test_call_checks_arity_itself() {
        for builtin in [Builtin::Car, Builtin::Cons, Builtin::ListRef, Builtin::Abs] {
            match call(builtin, &[]) {
                Ok(result) => panic!("Expected {} to fail, got {}", builtin.name(), result),
                Err(e) => assert_eq!(e.kind(), ErrorKind::Runtime, "{}", e),
            }
        }
        assert_eq!(
            call(Builtin::SetCdr, &[num(1)]).unwrap_err().to_string(),
            "RuntimeError: set-cdr! expects exactly 2 arguments, got 1"
        );
    }

    #[test]
    fn test_special_forms_are_not_callable() {
        assert_runtime_error(Builtin::If, &[Term::Boolean(true)]);
    }
}
