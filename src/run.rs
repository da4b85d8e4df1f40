//! Top-level query entry point: `run(n, |q| goal)`.
//!
//! Grounded on the teacher's `query.rs` (which drives a `Solver` over a
//! query goal and yields reified answers through an iterator).
use crate::cancel::CancellationToken;
use crate::goal::Goal;
use crate::reify::reify;
use crate::store::fresh_store;
use crate::stream::take;
use crate::term::{fresh, var, Term, Var};

/// Run `f(q)` against a fresh store and reify `q` in up to `n` solutions
/// (`n == 0` means all solutions).
pub fn run(n: usize, f: impl FnOnce(Var) -> Goal) -> Vec<Term> {
    run_cancellable(&CancellationToken::new(), n, f)
}

pub fn run_cancellable(ctx: &CancellationToken, n: usize, f: impl FnOnce(Var) -> Goal) -> Vec<Term> {
    let q = fresh("q");
    let goal = f(q.clone());
    let store = fresh_store();
    let stream = goal.run(ctx, store);
    take(ctx, stream, n)
        .into_iter()
        .map(|s| reify(&var(q.clone()), &s.bindings))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::goal::{conj, eq};
    use crate::relation::symbolo;
    use crate::term::{atom, symbol};

    #[test]
    fn scenario_symbolo_order_independent() {
        let a = run(0, |q| conj(vec![symbolo(var(q.clone())), eq(var(q), symbol("test"))]));
        let b = run(0, |q| conj(vec![eq(var(q.clone()), symbol("test")), symbolo(var(q))]));
        assert_eq!(a, vec![symbol("test")]);
        assert_eq!(b, vec![symbol("test")]);

        let c = run(0, |q| conj(vec![symbolo(var(q.clone())), eq(var(q), atom(42i64))]));
        let d = run(0, |q| conj(vec![eq(var(q.clone()), atom(42i64)), symbolo(var(q))]));
        assert!(c.is_empty());
        assert!(d.is_empty());
    }
}
