//! The subgoal table: one memoized entry per variant call pattern, plus
//! the subgoal dependency graph SCC detection runs over (spec §4.7).
//!
//! Scoped to the single-threaded relational evaluator (the rest of
//! `goal.rs`/`stream.rs`/`store.rs` is `Rc`-based by design, unlike the
//! `Arc`-based FD side that the parallel worker pool shares across
//! threads) — see DESIGN.md. A `thread_local` `RefCell` stands in for
//! spec's "read/write lock or per-entry lock" in that single-threaded
//! setting.
use crate::tabling::pattern::CallKey;
use crate::term::Term;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubgoalState {
    Active,
    Complete,
    Invalidated,
}

#[derive(Debug)]
struct SubgoalEntry {
    predicate_id: u64,
    state: SubgoalState,
    answers: Vec<Term>,
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<CallKey, SubgoalEntry>,
    edges: HashSet<(CallKey, CallKey)>,
}

thread_local! {
    static TABLE: RefCell<Table> = RefCell::new(Table::default());
}

pub fn state(key: &CallKey) -> Option<SubgoalState> {
    TABLE.with(|t| t.borrow().entries.get(key).map(|e| e.state))
}

pub fn answers(key: &CallKey) -> Vec<Term> {
    TABLE.with(|t| t.borrow().entries.get(key).map(|e| e.answers.clone()).unwrap_or_default())
}

pub fn answer_count(key: &CallKey) -> usize {
    TABLE.with(|t| t.borrow().entries.get(key).map(|e| e.answers.len()).unwrap_or(0))
}

/// Register `key` as `Active`; a no-op if it already has a live entry,
/// so a recursive re-entry sees whatever answers have accumulated so far.
pub fn begin(key: &CallKey, predicate_id: u64) {
    TABLE.with(|t| {
        t.borrow_mut().entries.entry(key.clone()).or_insert_with(|| SubgoalEntry {
            predicate_id,
            state: SubgoalState::Active,
            answers: Vec::new(),
        });
    });
}

/// Record `tuple` as an answer for `key`; returns `true` if it was new.
pub fn record_answer(key: &CallKey, tuple: Term) -> bool {
    TABLE.with(|t| {
        let mut t = t.borrow_mut();
        let entry = t.entries.get_mut(key).expect("begin() must run before record_answer()");
        if entry.answers.contains(&tuple) {
            false
        } else {
            entry.answers.push(tuple);
            true
        }
    })
}

pub fn complete(keys: &[CallKey]) {
    TABLE.with(|t| {
        let mut t = t.borrow_mut();
        for k in keys {
            if let Some(e) = t.entries.get_mut(k) {
                e.state = SubgoalState::Complete;
            }
        }
    });
}

/// Record that evaluating `caller` invoked `callee` as a nested tabled
/// subgoal; grows the dependency graph SCC detection runs over.
pub fn record_edge(caller: &CallKey, callee: &CallKey) {
    TABLE.with(|t| {
        t.borrow_mut().edges.insert((caller.clone(), callee.clone()));
    });
}

/// The strongly-connected component (Tarjan) `key` belongs to in the
/// subgoal dependency graph, including `key` itself. A subgoal with no
/// recorded edges is its own singleton component.
pub fn scc_containing(key: &CallKey) -> HashSet<CallKey> {
    TABLE.with(|t| {
        let t = t.borrow();
        let mut graph = DiGraph::<CallKey, ()>::new();
        let mut index: HashMap<CallKey, NodeIndex> = HashMap::new();
        for (a, b) in &t.edges {
            let ia = *index.entry(a.clone()).or_insert_with(|| graph.add_node(a.clone()));
            let ib = *index.entry(b.clone()).or_insert_with(|| graph.add_node(b.clone()));
            graph.add_edge(ia, ib, ());
        }
        if let Some(&start) = index.get(key) {
            for component in tarjan_scc(&graph) {
                if component.contains(&start) {
                    return component.into_iter().map(|ix| graph[ix].clone()).collect();
                }
            }
        }
        let mut single = HashSet::new();
        single.insert(key.clone());
        single
    })
}

/// Mark every subgoal of `predicate_id` `Invalidated`; the next tabled
/// call through that predicate re-evaluates it from scratch.
pub fn invalidate(predicate_id: u64) {
    TABLE.with(|t| {
        for e in t.borrow_mut().entries.values_mut() {
            if e.predicate_id == predicate_id {
                e.state = SubgoalState::Invalidated;
            }
        }
    });
}

/// Clear the entire table: every predicate, every call pattern.
pub fn invalidate_all() {
    TABLE.with(|t| {
        let mut t = t.borrow_mut();
        t.entries.clear();
        t.edges.clear();
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::atom;

    fn key(id: u64, n: i64) -> CallKey {
        crate::tabling::pattern::normalize(id, &[atom(n)], &crate::subst::Subst::new())
    }

    #[test]
    fn begin_then_record_then_complete_round_trips() {
        invalidate_all();
        let k = key(1, 1);
        begin(&k, 1);
        assert_eq!(state(&k), Some(SubgoalState::Active));
        assert!(record_answer(&k, atom(42i64)));
        assert!(!record_answer(&k, atom(42i64)));
        complete(&[k.clone()]);
        assert_eq!(state(&k), Some(SubgoalState::Complete));
        assert_eq!(answers(&k), vec![atom(42i64)]);
    }

    #[test]
    fn invalidate_targets_only_its_predicate() {
        invalidate_all();
        let a = key(10, 1);
        let b = key(20, 1);
        begin(&a, 10);
        begin(&b, 20);
        complete(&[a.clone(), b.clone()]);
        invalidate(10);
        assert_eq!(state(&a), Some(SubgoalState::Invalidated));
        assert_eq!(state(&b), Some(SubgoalState::Complete));
    }

    #[test]
    fn scc_detection_groups_mutually_dependent_keys() {
        invalidate_all();
        let a = key(1, 1);
        let b = key(2, 1);
        record_edge(&a, &b);
        record_edge(&b, &a);
        let scc = scc_containing(&a);
        assert!(scc.contains(&a));
        assert!(scc.contains(&b));
    }

    #[test]
    fn an_unrelated_key_is_its_own_component() {
        invalidate_all();
        let a = key(1, 1);
        let scc = scc_containing(&a);
        assert_eq!(scc.len(), 1);
    }
}
