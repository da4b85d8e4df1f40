//! Substitution and unification: walking variable chains to a root and
//! Robinson unification over `Term`.
use crate::term::{Term, Var};
use im::HashMap;

/// A substitution: a persistent mapping from variable id to its bound term.
/// Cloning is O(1) (structural sharing via `im::HashMap`).
pub type Subst = HashMap<u64, Term>;

/// Follow `t` through the substitution while it is a bound variable;
/// return the first non-variable or unbound variable encountered.
pub fn walk(t: &Term, s: &Subst) -> Term {
    let mut current = t.clone();
    loop {
        match &current {
            Term::Var(v) => match s.get(&v.id) {
                Some(bound) => current = bound.clone(),
                None => return current,
            },
            _ => return current,
        }
    }
}

fn bind(v: &Var, t: Term, s: &Subst) -> Subst {
    s.update(v.id, t)
}

/// Standard Robinson unification. Fails on constructor mismatch; atoms
/// unify by equality; pairs unify structurally.
///
/// This implementation never performs an occurs check by default (see
/// `unify_occurs_check` for the alternative policy); proto-vulcan's own
/// unifier reaches for one only through its user-extensible `unify` hook,
/// so "never-on" is the more direct reading of the teacher's default path.
pub fn unify(a: &Term, b: &Term, s: &Subst) -> Option<Subst> {
    unify_with(a, b, s, false)
}

/// Unification with an occurs check: refuses to bind a variable to a term
/// that contains it, preventing cyclic substitutions outright.
pub fn unify_occurs_check(a: &Term, b: &Term, s: &Subst) -> Option<Subst> {
    unify_with(a, b, s, true)
}

fn occurs(v: &Var, t: &Term, s: &Subst) -> bool {
    match walk(t, s) {
        Term::Var(tv) => tv == *v,
        Term::Pair(car, cdr) => occurs(v, &car, s) || occurs(v, &cdr, s),
        _ => false,
    }
}

fn unify_with(a: &Term, b: &Term, s: &Subst, occurs_check: bool) -> Option<Subst> {
    let aw = walk(a, s);
    let bw = walk(b, s);
    match (&aw, &bw) {
        (Term::Var(va), Term::Var(vb)) if va == vb => Some(s.clone()),
        (Term::Var(v), _) => {
            if occurs_check && occurs(v, &bw, s) {
                None
            } else {
                Some(bind(v, bw, s))
            }
        }
        (_, Term::Var(v)) => {
            if occurs_check && occurs(v, &aw, s) {
                None
            } else {
                Some(bind(v, aw, s))
            }
        }
        (Term::Atom(x), Term::Atom(y)) => {
            if x == y {
                Some(s.clone())
            } else {
                None
            }
        }
        (Term::Nil, Term::Nil) => Some(s.clone()),
        (Term::Pair(a1, a2), Term::Pair(b1, b2)) => {
            let s1 = unify_with(a1, b1, s, occurs_check)?;
            unify_with(a2, b2, &s1, occurs_check)
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::{atom, fresh, list, pair, var};

    #[test]
    fn walk_follows_chain() {
        let v0 = fresh("v0");
        let v1 = fresh("v1");
        let s = Subst::new().update(v0.id, var(v1.clone())).update(v1.id, atom(5i64));
        assert_eq!(walk(&var(v0), &s), atom(5i64));
    }

    #[test]
    fn unify_atoms() {
        let s = Subst::new();
        assert!(unify(&atom(1i64), &atom(1i64), &s).is_some());
        assert!(unify(&atom(1i64), &atom(2i64), &s).is_none());
    }

    #[test]
    fn unify_var_with_term() {
        let v = fresh("q");
        let s = Subst::new();
        let s1 = unify(&var(v.clone()), &atom(42i64), &s).unwrap();
        assert_eq!(walk(&var(v), &s1), atom(42i64));
    }

    #[test]
    fn unify_pairs_structurally() {
        let s = Subst::new();
        let l1 = list(vec![atom(1i64), atom(2i64)]);
        let l2 = list(vec![atom(1i64), atom(2i64)]);
        assert!(unify(&l1, &l2, &s).is_some());
        let l3 = list(vec![atom(1i64), atom(3i64)]);
        assert!(unify(&l1, &l3, &s).is_none());
    }

    #[test]
    fn occurs_check_rejects_cycle() {
        let v = fresh("q");
        let s = Subst::new();
        let cyclic = pair(var(v.clone()), atom(1i64));
        assert!(unify_occurs_check(&var(v.clone()), &cyclic, &s).is_none());
        // default policy tolerates it (never-on)
        assert!(unify(&var(v), &cyclic, &s).is_some());
    }
}
