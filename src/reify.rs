//! Reification: fully walk a term and replace every still-unbound
//! variable with a stable name (`_0`, `_1`, …) assigned in left-to-right
//! order of first appearance.
//!
//! Grounded on the teacher's `state/reification.rs`.
use crate::subst::{walk, Subst};
use crate::term::{Atom, Term};
use std::collections::HashMap;
use std::rc::Rc;

pub fn reify(t: &Term, s: &Subst) -> Term {
    let mut seen: HashMap<u64, u64> = HashMap::new();
    reify_rec(t, s, &mut seen)
}

fn reify_rec(t: &Term, s: &Subst, seen: &mut HashMap<u64, u64>) -> Term {
    let walked = walk(t, s);
    match walked {
        Term::Var(v) => {
            let next = seen.len() as u64;
            let idx = *seen.entry(v.id).or_insert(next);
            Term::Atom(Atom::Symbol(Rc::from(format!("_{idx}").as_str())))
        }
        Term::Pair(car, cdr) => {
            let car = reify_rec(&car, s, seen);
            let cdr = reify_rec(&cdr, s, seen);
            Term::Pair(Rc::new(car), Rc::new(cdr))
        }
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::{atom, fresh, list, var};

    #[test]
    fn reify_names_unbound_vars_in_order() {
        let a = fresh("a");
        let b = fresh("b");
        let s = Subst::new();
        let t = list(vec![var(b.clone()), var(a.clone()), var(b)]);
        let r = reify(&t, &s);
        assert_eq!(
            r,
            list(vec![
                Term::Atom(Atom::Symbol(Rc::from("_0"))),
                Term::Atom(Atom::Symbol(Rc::from("_1"))),
                Term::Atom(Atom::Symbol(Rc::from("_0"))),
            ])
        );
    }

    #[test]
    fn reify_walks_bound_vars() {
        let a = fresh("a");
        let s = Subst::new().update(a.id, atom(5i64));
        assert_eq!(reify(&var(a), &s), atom(5i64));
    }
}
