//! Goals and their combinators: conjunction, interleaving disjunction,
//! `once`, and the soft-cut `conda`/`condu` pair.
//!
//! Grounded on the teacher's `operator/conj.rs`, `operator/disj.rs`,
//! `operator/conda.rs`, `operator/condu.rs`, `operator/onceo.rs`, and
//! `relation/eq.rs`, with the generic `User`/`Engine` parametrization
//! dropped (see `stream.rs`).
use crate::cancel::CancellationToken;
use crate::store::{newly_bound_vars, LocalConstraintStore};
use crate::stream::{self, LazyStream, Stream};
use crate::subst;
use crate::term::{fresh, Term, Var};
use std::rc::Rc;

/// A goal: a function from (cancellation handle, store) to a result
/// stream. Cheap to clone (reference-counted).
#[derive(Clone)]
pub struct Goal(Rc<dyn Fn(&CancellationToken, LocalConstraintStore) -> Stream>);

impl std::fmt::Debug for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Goal(..)")
    }
}

impl Goal {
    pub fn new(f: impl Fn(&CancellationToken, LocalConstraintStore) -> Stream + 'static) -> Goal {
        Goal(Rc::new(f))
    }

    pub fn run(&self, ctx: &CancellationToken, store: LocalConstraintStore) -> Stream {
        (self.0)(ctx, store)
    }

    pub fn succeed() -> Goal {
        Goal::new(|_ctx, store| Stream::unit(Box::new(store)))
    }

    pub fn fail() -> Goal {
        Goal::new(|_ctx, _store| Stream::empty())
    }
}

/// Unify `u` and `v`; on success, re-check every constraint touched by
/// the newly-bound variables (spec §4.1's order-independence contract).
pub fn eq(u: Term, v: Term) -> Goal {
    Goal::new(move |_ctx, store| {
        let before = store.bindings.clone();
        match subst::unify(&u, &v, &store.bindings) {
            None => Stream::empty(),
            Some(bindings) => {
                let fallback: Vec<Var> = [&u, &v]
                    .iter()
                    .flat_map(|t| term_vars(t))
                    .collect();
                let touched = newly_bound_vars(&before, &bindings, &fallback);
                let next = store.with_bindings(bindings);
                match next.recheck_constraints(&touched) {
                    Some(checked) => Stream::unit(Box::new(checked)),
                    None => Stream::empty(),
                }
            }
        }
    })
}

fn term_vars(t: &Term) -> Vec<Var> {
    let mut out = Vec::new();
    fn go(t: &Term, out: &mut Vec<Var>) {
        match t {
            Term::Var(v) => out.push(v.clone()),
            Term::Pair(a, b) => {
                go(a, out);
                go(b, out);
            }
            _ => {}
        }
    }
    go(t, &mut out);
    out
}

/// Allocate one fresh variable and build a goal from it.
pub fn fresh_goal(f: impl FnOnce(Var) -> Goal) -> Goal {
    let v = fresh("_");
    f(v)
}

/// Allocate `n` fresh variables and build a goal from them.
pub fn fresh_goal_n(n: usize, f: impl FnOnce(Vec<Var>) -> Goal) -> Goal {
    let vars: Vec<Var> = (0..n).map(|i| fresh(format!("_{i}"))).collect();
    f(vars)
}

pub fn conj2(g1: Goal, g2: Goal) -> Goal {
    Goal::new(move |_ctx, store| {
        let paused = LazyStream::pause(Box::new(store), g1.clone());
        Stream::bind(Stream::immature(paused), g2.clone())
    })
}

/// Left-to-right conjunction of any number of goals (`conj()` is `succeed`).
pub fn conj(goals: impl IntoIterator<Item = Goal>) -> Goal {
    let mut goals: Vec<Goal> = goals.into_iter().collect();
    let mut acc = Goal::succeed();
    while let Some(g) = goals.pop() {
        acc = conj2(g, acc);
    }
    acc
}

pub fn disj2(g1: Goal, g2: Goal) -> Goal {
    Goal::new(move |_ctx, store| {
        let s1 = LazyStream::pause(Box::new(store.clone()), g1.clone());
        let s2 = LazyStream::pause(Box::new(store), g2.clone());
        Stream::mplus(Stream::immature(s1), s2)
    })
}

/// Fair interleaving disjunction of any number of goals (`disj()` is `fail`).
pub fn disj(goals: impl IntoIterator<Item = Goal>) -> Goal {
    let mut goals: Vec<Goal> = goals.into_iter().collect();
    let mut acc = Goal::fail();
    while let Some(g) = goals.pop() {
        acc = disj2(g, acc);
    }
    acc
}

/// `conde` clauses: each clause is a conjunction of goals; the whole
/// construct is the interleaving disjunction of the clauses.
pub fn conde(clauses: impl IntoIterator<Item = Vec<Goal>>) -> Goal {
    disj(clauses.into_iter().map(conj))
}

/// Restrict `g` to at most one solution; the underlying stream is
/// dropped immediately afterwards.
pub fn once(g: Goal) -> Goal {
    Goal::new(move |ctx, store| {
        let produced = g.run(ctx, store);
        let mut results = stream::take(ctx, produced, 1);
        match results.pop() {
            Some(s) => Stream::unit(s),
            None => Stream::empty(),
        }
    })
}

/// A soft-cut clause: a guard goal and a conjunction of body goals.
pub struct CondClause {
    pub guard: Goal,
    pub body: Vec<Goal>,
}

pub fn clause(guard: Goal, body: impl IntoIterator<Item = Goal>) -> CondClause {
    CondClause {
        guard,
        body: body.into_iter().collect(),
    }
}

/// Soft-cut: the first clause whose guard succeeds (possibly with many
/// answers) commits to its body over every one of the guard's answers;
/// all later clauses are discarded.
pub fn conda(clauses: Vec<CondClause>) -> Goal {
    Goal::new(move |ctx, store| {
        for c in &clauses {
            let guard_stream = c.guard.run(ctx, store.clone());
            let forced = stream::force_stream(ctx, guard_stream);
            if forced.is_empty() {
                continue;
            }
            let body_goal = conj(c.body.clone());
            return Stream::bind(forced, body_goal);
        }
        Stream::empty()
    })
}

/// Soft-cut restricted to a single guard solution: the first clause
/// whose guard succeeds commits to its body over that one answer only.
pub fn condu(clauses: Vec<CondClause>) -> Goal {
    Goal::new(move |ctx, store| {
        for c in &clauses {
            let guard_stream = c.guard.run(ctx, store.clone());
            let mut one = stream::take(ctx, guard_stream, 1);
            if let Some(answer) = one.pop() {
                let body_goal = conj(c.body.clone());
                return Stream::bind(Stream::unit(answer), body_goal);
            }
        }
        Stream::empty()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::fresh_store;
    use crate::term::{atom, var};
    use crate::subst;

    fn run_q(g: Goal, q: &Var) -> Vec<Term> {
        let ctx = CancellationToken::new();
        let store = fresh_store();
        let stream = g.run(&ctx, store);
        stream::take(&ctx, stream, 0)
            .into_iter()
            .map(|s| subst::walk(&var(q.clone()), &s.bindings))
            .collect()
    }

    #[test]
    fn conj_runs_goals_left_to_right() {
        let q = fresh("q");
        let g = conj(vec![eq(var(q.clone()), atom(1i64)), Goal::succeed()]);
        assert_eq!(run_q(g, &q), vec![atom(1i64)]);
    }

    #[test]
    fn conj_fails_on_mismatch() {
        let q = fresh("q");
        let g = conj(vec![
            eq(var(q.clone()), atom(1i64)),
            eq(var(q.clone()), atom(2i64)),
        ]);
        assert!(run_q(g, &q).is_empty());
    }

    #[test]
    fn disj_interleaves_both_branches() {
        let q = fresh("q");
        let g = disj(vec![eq(var(q.clone()), atom(1i64)), eq(var(q.clone()), atom(2i64))]);
        let mut results = run_q(g, &q);
        results.sort_by_key(|t| match t {
            Term::Atom(crate::term::Atom::Int(i)) => *i,
            _ => 0,
        });
        assert_eq!(results, vec![atom(1i64), atom(2i64)]);
    }

    #[test]
    fn once_keeps_a_single_answer() {
        let q = fresh("q");
        let g = once(disj(vec![
            eq(var(q.clone()), atom(1i64)),
            eq(var(q.clone()), atom(2i64)),
        ]));
        assert_eq!(run_q(g, &q).len(), 1);
    }

    #[test]
    fn conda_commits_to_first_successful_guard() {
        let q = fresh("q");
        let g = conda(vec![
            clause(Goal::succeed(), vec![eq(var(q.clone()), atom(1i64))]),
            clause(Goal::succeed(), vec![eq(var(q.clone()), atom(2i64))]),
        ]);
        assert_eq!(run_q(g, &q), vec![atom(1i64)]);
    }

    #[test]
    fn condu_restricts_guard_to_one_answer() {
        let q = fresh("q");
        let r = fresh("r");
        let g = condu(vec![clause(
            disj(vec![eq(var(r.clone()), atom(1i64)), eq(var(r.clone()), atom(2i64))]),
            vec![eq(var(q.clone()), atom(9i64))],
        )]);
        assert_eq!(run_q(g, &q), vec![atom(9i64)]);
    }

    use proptest::prelude::*;

    proptest! {
        /// spec §8: unifying a variable against a sequence of ground
        /// atoms is order-independent — the same set of bindings holds
        /// no matter which `eq` goal runs first.
        #[test]
        fn conj_of_eq_goals_is_order_independent(values in proptest::collection::vec(any::<i64>(), 1..6)) {
            let q = fresh("q");
            let r = fresh("r");
            let forward: Vec<Goal> = values.iter().map(|v| eq(var(r.clone()), atom(*v))).collect();
            let mut backward = forward.clone();
            backward.reverse();

            let forward_goal = conj(vec![eq(var(q.clone()), var(r.clone())), conj(forward)]);
            let backward_goal = conj(vec![eq(var(q.clone()), var(r.clone())), conj(backward)]);

            let forward_results = run_q(forward_goal, &q);
            let backward_results = run_q(backward_goal, &q);
            prop_assert_eq!(forward_results, backward_results);
        }
    }
}
