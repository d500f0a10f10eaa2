//! Zero-argument boolean filters.
//!
//! Key bindings, conditional containers, window options and completers all
//! take decisions that depend on application state the framework cannot see
//! (mode flags, focus, user configuration). A `Filter` packages that decision
//! as a cheap closure evaluated at the moment it matters: during key-match
//! candidate selection, or during a render pass.
//!
//! Filters compose with `&` (and), `|` (or) and `!` (not) so call sites read
//! like the condition they express.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

/// A shared, reevaluatable boolean condition.
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn() -> bool + Send + Sync>);

impl Filter {
    pub fn new(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Filter that is always true.
    pub fn always() -> Self {
        Self::new(|| true)
    }

    /// Filter that is always false.
    pub fn never() -> Self {
        Self::new(|| false)
    }

    pub fn eval(&self) -> bool {
        (self.0)()
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        if value { Self::always() } else { Self::never() }
    }
}

impl BitAnd for Filter {
    type Output = Filter;
    fn bitand(self, rhs: Filter) -> Filter {
        Filter::new(move || self.eval() && rhs.eval())
    }
}

impl BitOr for Filter {
    type Output = Filter;
    fn bitor(self, rhs: Filter) -> Filter {
        Filter::new(move || self.eval() || rhs.eval())
    }
}

impl Not for Filter {
    type Output = Filter;
    fn not(self) -> Filter {
        Filter::new(move || !self.eval())
    }
}

/// Named constructor used where a filter wraps a single readable condition:
/// `Condition::new(move || state.lock().unwrap().insert_mode)`.
pub struct Condition;

impl Condition {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(f: impl Fn() -> bool + Send + Sync + 'static) -> Filter {
        Filter::new(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn constants() {
        assert!(Filter::always().eval());
        assert!(!Filter::never().eval());
    }

    #[test]
    fn reevaluated_each_call() {
        let flag = Arc::new(AtomicBool::new(false));
        let f = {
            let flag = flag.clone();
            Filter::new(move || flag.load(Ordering::Relaxed))
        };
        assert!(!f.eval());
        flag.store(true, Ordering::Relaxed);
        assert!(f.eval());
    }

    #[test]
    fn combinators() {
        let t = Filter::always();
        let n = Filter::never();
        assert!((t.clone() | n.clone()).eval());
        assert!(!(t.clone() & n.clone()).eval());
        assert!((!n).eval());
    }

    #[test]
    fn from_bool() {
        assert!(Filter::from(true).eval());
        assert!(!Filter::from(false).eval());
    }
}
