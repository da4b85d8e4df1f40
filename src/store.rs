//! Per-branch relational state: the substitution plus the list of
//! pending constraints, coordinated through a shared global bus.
//!
//! Grounded on the teacher's `state/constraint/store.rs` (an ordered
//! constraint list carried alongside a substitution) and
//! `state/constraint/mod.rs`'s `check`-based constraint contract,
//! generalized to the explicit `Constraint` trait spec §3 describes.
use crate::subst::{self, Subst};
use crate::term::{Term, Var};
use im::Vector;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The result of checking one constraint against the current store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    Satisfied,
    Violated,
    Pending,
}

/// A pure, checkable relational constraint. Every concrete kind below
/// is a plain value; updating a store never mutates a constraint, it
/// produces a new store carrying a filtered/extended constraint list.
pub trait Constraint: std::fmt::Debug {
    fn constraint_id(&self) -> u64;

    /// Variable ids this constraint references, used to decide which
    /// constraints need re-checking after a unification.
    fn vars(&self) -> Vec<u64>;

    fn check(&self, store: &LocalConstraintStore) -> CheckResult;

    /// Local-only constraints are re-checked purely against `bindings`;
    /// globally-coordinated ones may also consult `global_bus`.
    fn is_global(&self) -> bool {
        false
    }
}

/// Cross-store coordination point for globally-coordinated constraints
/// (shared between branches and, in parallel search, between workers).
/// Kept deliberately small: an id allocator today, the natural place to
/// grow shared bookkeeping (e.g. a global fact table) tomorrow.
#[derive(Debug, Default)]
pub struct GlobalConstraintBus {
    next_constraint_id: AtomicU64,
}

impl GlobalConstraintBus {
    pub fn new() -> GlobalConstraintBus {
        GlobalConstraintBus::default()
    }

    pub fn alloc_id(&self) -> u64 {
        self.next_constraint_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Disequality: `a` and `b` must never walk to the same term.
#[derive(Debug, Clone)]
pub struct Disequality {
    pub id: u64,
    pub a: Term,
    pub b: Term,
}

impl Constraint for Disequality {
    fn constraint_id(&self) -> u64 {
        self.id
    }

    fn vars(&self) -> Vec<u64> {
        collect_vars(&self.a, &self.b)
    }

    fn check(&self, store: &LocalConstraintStore) -> CheckResult {
        match subst::unify(&self.a, &self.b, &store.bindings) {
            None => CheckResult::Satisfied,
            Some(extended) => {
                if extended == store.bindings {
                    CheckResult::Violated
                } else {
                    CheckResult::Pending
                }
            }
        }
    }
}

/// Absence: `needle` must never occur as a subterm of `haystack`.
#[derive(Debug, Clone)]
pub struct Absence {
    pub id: u64,
    pub needle: Term,
    pub haystack: Term,
}

impl Constraint for Absence {
    fn constraint_id(&self) -> u64 {
        self.id
    }

    fn vars(&self) -> Vec<u64> {
        collect_vars(&self.needle, &self.haystack)
    }

    fn check(&self, store: &LocalConstraintStore) -> CheckResult {
        let needle = subst::walk(&self.needle, &store.bindings);
        fn contains(needle: &Term, hay: &Term, s: &Subst) -> (bool, bool) {
            let hay = subst::walk(hay, s);
            if *needle == hay {
                return (true, false);
            }
            match &hay {
                Term::Var(_) => (false, true), // might still become needle
                Term::Pair(car, cdr) => {
                    let (found1, pending1) = contains(needle, car, s);
                    let (found2, pending2) = contains(needle, cdr, s);
                    (found1 || found2, pending1 || pending2)
                }
                _ => (false, false),
            }
        }
        if !needle.is_var() {
            let (found, pending) = contains(&needle, &self.haystack, &store.bindings);
            if found {
                CheckResult::Violated
            } else if pending {
                CheckResult::Pending
            } else {
                CheckResult::Satisfied
            }
        } else {
            CheckResult::Pending
        }
    }
}

/// The set of ground types a `Type` constraint can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Symbol,
    Number,
    Str,
    Boolean,
    Pair,
    Vector,
    Compound,
}

#[derive(Debug, Clone)]
pub struct TypeConstraint {
    pub id: u64,
    pub kind: TypeKind,
    pub term: Term,
}

impl Constraint for TypeConstraint {
    fn constraint_id(&self) -> u64 {
        self.id
    }

    fn vars(&self) -> Vec<u64> {
        var_ids(&self.term)
    }

    fn check(&self, store: &LocalConstraintStore) -> CheckResult {
        let walked = subst::walk(&self.term, &store.bindings);
        match (&walked, self.kind) {
            (Term::Var(_), _) => CheckResult::Pending,
            (Term::Atom(a), TypeKind::Symbol) if a.is_symbol() => CheckResult::Satisfied,
            (Term::Atom(a), TypeKind::Number) if a.is_number() => CheckResult::Satisfied,
            (Term::Atom(a), TypeKind::Str) if a.is_string() => CheckResult::Satisfied,
            (Term::Atom(a), TypeKind::Boolean) if a.is_bool() => CheckResult::Satisfied,
            (Term::Pair(_, _), TypeKind::Pair) => CheckResult::Satisfied,
            (Term::Pair(_, _), TypeKind::Vector) => CheckResult::Satisfied,
            (Term::Pair(_, _), TypeKind::Compound) => CheckResult::Satisfied,
            (Term::Nil, TypeKind::Vector) => CheckResult::Satisfied,
            _ => CheckResult::Violated,
        }
    }
}

/// Membership: `needle` must walk-equal one element of the proper or
/// improper list `haystack`.
#[derive(Debug, Clone)]
pub struct Membership {
    pub id: u64,
    pub needle: Term,
    pub haystack: Term,
}

impl Constraint for Membership {
    fn constraint_id(&self) -> u64 {
        self.id
    }

    fn vars(&self) -> Vec<u64> {
        collect_vars(&self.needle, &self.haystack)
    }

    fn check(&self, store: &LocalConstraintStore) -> CheckResult {
        let mut cur = subst::walk(&self.haystack, &store.bindings);
        let mut any_pending = false;
        loop {
            match cur {
                Term::Pair(car, cdr) => {
                    let head = subst::walk(&car, &store.bindings);
                    if head == subst::walk(&self.needle, &store.bindings) {
                        return CheckResult::Satisfied;
                    }
                    if head.is_var() {
                        any_pending = true;
                    }
                    cur = subst::walk(&cdr, &store.bindings);
                }
                Term::Var(_) => {
                    any_pending = true;
                    break;
                }
                _ => break,
            }
        }
        if any_pending {
            CheckResult::Pending
        } else {
            CheckResult::Violated
        }
    }
}

/// Finiteness: `term` must eventually walk to a proper, finite list.
#[derive(Debug, Clone)]
pub struct Finiteness {
    pub id: u64,
    pub term: Term,
}

impl Constraint for Finiteness {
    fn constraint_id(&self) -> u64 {
        self.id
    }

    fn vars(&self) -> Vec<u64> {
        var_ids(&self.term)
    }

    fn check(&self, store: &LocalConstraintStore) -> CheckResult {
        let mut cur = subst::walk(&self.term, &store.bindings);
        loop {
            match cur {
                Term::Nil => return CheckResult::Satisfied,
                Term::Pair(_, cdr) => cur = subst::walk(&cdr, &store.bindings),
                Term::Var(_) => return CheckResult::Pending,
                _ => return CheckResult::Violated,
            }
        }
    }
}

fn var_ids(t: &Term) -> Vec<u64> {
    let mut out = Vec::new();
    fn go(t: &Term, out: &mut Vec<u64>) {
        match t {
            Term::Var(v) => out.push(v.id),
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

fn collect_vars(a: &Term, b: &Term) -> Vec<u64> {
    let mut v = var_ids(a);
    v.extend(var_ids(b));
    v
}

/// Per-branch relational state.
#[derive(Debug, Clone)]
pub struct LocalConstraintStore {
    pub bindings: Subst,
    pub constraints: Vector<Rc<dyn Constraint>>,
    pub global_bus: Arc<GlobalConstraintBus>,
    pub id: Rc<str>,
}

impl LocalConstraintStore {
    pub fn new(global_bus: Arc<GlobalConstraintBus>, id: impl Into<Rc<str>>) -> LocalConstraintStore {
        LocalConstraintStore {
            bindings: Subst::new(),
            constraints: Vector::new(),
            global_bus,
            id: id.into(),
        }
    }

    pub fn fresh_branch(&self, id: impl Into<Rc<str>>) -> LocalConstraintStore {
        LocalConstraintStore {
            bindings: self.bindings.clone(),
            constraints: self.constraints.clone(),
            global_bus: self.global_bus.clone(),
            id: id.into(),
        }
    }

    pub fn with_bindings(&self, bindings: Subst) -> LocalConstraintStore {
        LocalConstraintStore {
            bindings,
            constraints: self.constraints.clone(),
            global_bus: self.global_bus.clone(),
            id: self.id.clone(),
        }
    }

    pub fn add_constraint(&self, c: Rc<dyn Constraint>) -> LocalConstraintStore {
        let mut constraints = self.constraints.clone();
        constraints.push_back(c);
        LocalConstraintStore {
            bindings: self.bindings.clone(),
            constraints,
            global_bus: self.global_bus.clone(),
            id: self.id.clone(),
        }
    }

    /// Re-check every constraint whose variable set intersects
    /// `touched`; fail (return `None`) on the first `Violated`, dropping
    /// any constraint found `Satisfied` (it can never fire again).
    pub fn recheck_constraints(&self, touched: &[u64]) -> Option<LocalConstraintStore> {
        let mut kept = Vector::new();
        for c in self.constraints.iter() {
            let intersects = c.vars().iter().any(|v| touched.contains(v));
            if !intersects {
                kept.push_back(c.clone());
                continue;
            }
            match c.check(self) {
                CheckResult::Violated => return None,
                CheckResult::Satisfied => {}
                CheckResult::Pending => kept.push_back(c.clone()),
            }
        }
        Some(LocalConstraintStore {
            bindings: self.bindings.clone(),
            constraints: kept,
            global_bus: self.global_bus.clone(),
            id: self.id.clone(),
        })
    }

    pub fn alloc_constraint_id(&self) -> u64 {
        self.global_bus.alloc_id()
    }
}

pub fn fresh_store() -> LocalConstraintStore {
    LocalConstraintStore::new(Arc::new(GlobalConstraintBus::new()), "root")
}

/// Returns the ids of variables newly bound going from `before` to
/// `after` (used to decide which pending constraints need re-checking).
pub fn newly_bound_vars(before: &Subst, after: &Subst, fallback: &[Var]) -> Vec<u64> {
    if after.len() == before.len() {
        // Unification may have bound existing-length-preserving re-binds;
        // fall back to the variables referenced by the unified terms.
        return fallback.iter().map(|v| v.id).collect();
    }
    after
        .keys()
        .filter(|k| !before.contains_key(k))
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::{atom, fresh, var};

    #[test]
    fn disequality_detects_violation() {
        let store = fresh_store();
        let v = fresh("q");
        let c = Disequality {
            id: 0,
            a: var(v.clone()),
            b: atom(1i64),
        };
        let store = store.with_bindings(store.bindings.update(v.id, atom(1i64)));
        assert_eq!(c.check(&store), CheckResult::Violated);
    }

    #[test]
    fn disequality_satisfied_on_mismatch() {
        let store = fresh_store();
        let v = fresh("q");
        let c = Disequality {
            id: 0,
            a: var(v.clone()),
            b: atom(1i64),
        };
        let store = store.with_bindings(store.bindings.update(v.id, atom(2i64)));
        assert_eq!(c.check(&store), CheckResult::Satisfied);
    }

    #[test]
    fn disequality_pending_while_unbound() {
        let store = fresh_store();
        let v = fresh("q");
        let c = Disequality {
            id: 0,
            a: var(v),
            b: atom(1i64),
        };
        assert_eq!(c.check(&store), CheckResult::Pending);
    }
}
