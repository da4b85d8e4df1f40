//! Relational constraint goals: `neq`, `absento`, the ground-type
//! predicates, `membero`, and `project`.
//!
//! Grounded on the teacher's `relation/diseq.rs`, `relation/membero.rs`,
//! and the type-predicate relations scattered through `relation/mod.rs`,
//! simplified to post a single `Constraint` value into the store rather
//! than the teacher's constraint-tree representation.
use crate::goal::{disj, eq, Goal};
use crate::store::{Absence, CheckResult, Disequality, TypeConstraint, TypeKind};
use crate::stream::Stream;
use crate::subst::{self, Subst};
use crate::term::Term;
use std::rc::Rc;

/// `a != b`: posts a `Disequality` constraint, failing immediately if
/// it is already violated and dropping it immediately if it is already
/// satisfied.
pub fn neq(a: Term, b: Term) -> Goal {
    Goal::new(move |_ctx, store| {
        let id = store.alloc_constraint_id();
        let c = Rc::new(Disequality {
            id,
            a: a.clone(),
            b: b.clone(),
        });
        match c.check(&store) {
            CheckResult::Violated => Stream::empty(),
            CheckResult::Satisfied => Stream::unit(Box::new(store)),
            CheckResult::Pending => Stream::unit(Box::new(store.add_constraint(c))),
        }
    })
}

/// `needle` must never occur as a subterm of `haystack`.
pub fn absento(needle: Term, haystack: Term) -> Goal {
    Goal::new(move |_ctx, store| {
        let id = store.alloc_constraint_id();
        let c = Rc::new(Absence {
            id,
            needle: needle.clone(),
            haystack: haystack.clone(),
        });
        match c.check(&store) {
            CheckResult::Violated => Stream::empty(),
            CheckResult::Satisfied => Stream::unit(Box::new(store)),
            CheckResult::Pending => Stream::unit(Box::new(store.add_constraint(c))),
        }
    })
}

fn type_goal(kind: TypeKind, t: Term) -> Goal {
    Goal::new(move |_ctx, store| {
        let id = store.alloc_constraint_id();
        let c = Rc::new(TypeConstraint {
            id,
            kind,
            term: t.clone(),
        });
        match c.check(&store) {
            CheckResult::Violated => Stream::empty(),
            CheckResult::Satisfied => Stream::unit(Box::new(store)),
            CheckResult::Pending => Stream::unit(Box::new(store.add_constraint(c))),
        }
    })
}

pub fn symbolo(t: Term) -> Goal {
    type_goal(TypeKind::Symbol, t)
}

pub fn numbero(t: Term) -> Goal {
    type_goal(TypeKind::Number, t)
}

pub fn stringo(t: Term) -> Goal {
    type_goal(TypeKind::Str, t)
}

pub fn booleano(t: Term) -> Goal {
    type_goal(TypeKind::Boolean, t)
}

fn proper_prefix(haystack: &Term, s: &Subst) -> Vec<Term> {
    let mut out = Vec::new();
    let mut cur = subst::walk(haystack, s);
    loop {
        match cur {
            Term::Pair(car, cdr) => {
                out.push((*car).clone());
                cur = subst::walk(&cdr, s);
            }
            _ => break,
        }
    }
    out
}

/// `needle` unifies with some element of the list `haystack`: a
/// generative relation (like the teacher's `membero`), not a mere
/// constraint check — with `needle` unbound it enumerates one answer
/// per list element.
pub fn membero(needle: Term, haystack: Term) -> Goal {
    Goal::new(move |ctx, store| {
        let elems = proper_prefix(&haystack, &store.bindings);
        let goals: Vec<Goal> = elems.into_iter().map(|e| eq(needle.clone(), e)).collect();
        disj(goals).run(ctx, store)
    })
}

/// Project a list of terms to their fully-walked ground values and
/// build a follow-up goal from them. Fails if any term is still
/// unbound when projected.
pub fn project(vars: Vec<Term>, f: impl Fn(Vec<Term>) -> Goal + 'static) -> Goal {
    Goal::new(move |ctx, store| {
        let values: Vec<Term> = vars.iter().map(|t| subst::walk(t, &store.bindings)).collect();
        let goal = f(values);
        goal.run(ctx, store)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::goal::{conj, eq};
    use crate::store::fresh_store;
    use crate::stream::take;
    use crate::term::{atom, fresh, list, symbol, var};

    fn solve(g: Goal) -> usize {
        let ctx = CancellationToken::new();
        take(&ctx, g.run(&ctx, fresh_store()), 0).len()
    }

    #[test]
    fn neq_rejects_equal_ground_values() {
        assert_eq!(solve(neq(atom(1i64), atom(1i64))), 0);
        assert_eq!(solve(neq(atom(1i64), atom(2i64))), 1);
    }

    #[test]
    fn symbolo_is_order_independent_with_eq() {
        let q = fresh("q");
        let a = conj(vec![symbolo(var(q.clone())), eq(var(q.clone()), symbol("test"))]);
        let b = conj(vec![eq(var(q.clone()), symbol("test")), symbolo(var(q))]);
        assert_eq!(solve(a), 1);
        assert_eq!(solve(b), 1);
    }

    #[test]
    fn symbolo_rejects_numbers_either_order() {
        let q = fresh("q");
        let a = conj(vec![symbolo(var(q.clone())), eq(var(q.clone()), atom(42i64))]);
        let b = conj(vec![eq(var(q.clone()), atom(42i64)), symbolo(var(q))]);
        assert_eq!(solve(a), 0);
        assert_eq!(solve(b), 0);
    }

    #[test]
    fn membero_enumerates_list_elements() {
        let q = fresh("q");
        let g = membero(var(q), list(vec![atom(1i64), atom(2i64), atom(3i64)]));
        assert_eq!(solve(g), 3);
    }

    #[test]
    fn absento_rejects_occurrence() {
        let g = absento(atom(1i64), list(vec![atom(1i64), atom(2i64)]));
        assert_eq!(solve(g), 0);
        let g2 = absento(atom(9i64), list(vec![atom(1i64), atom(2i64)]));
        assert_eq!(solve(g2), 1);
    }
}
