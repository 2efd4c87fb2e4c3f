//! Stack growth for the recursive reader and evaluator.
//!
//! Deeply nested input and deep (non-tail) recursion in user programs would
//! otherwise exhaust the native stack before the evaluator's depth limit is
//! reached.

/// If less than this remains, the stack is grown before recursing.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
