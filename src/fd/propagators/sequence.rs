//! `Sequence(vars, S, width, lo, hi)`: sliding-window bounds
//! consistency, and `Stretch(vars, S, min_run, max_run)`: local
//! run-length filtering (spec §4.4).
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct Sequence {
    vars: Vec<VarId>,
    set: Domain,
    width: usize,
    lo: u32,
    hi: u32,
}

impl Sequence {
    pub fn new(vars: Vec<VarId>, set: Domain, width: usize, lo: u32, hi: u32) -> Sequence {
        Sequence { vars, set, width, lo, hi }
    }
}

impl Propagator for Sequence {
    fn variables(&self) -> Vec<VarId> {
        self.vars.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.vars.len();
        if self.width == 0 || self.width > n {
            return Ok((state.clone(), false));
        }
        let mut result = state.clone();
        let mut changed = false;

        for w in 0..=(n - self.width) {
            let window = w..(w + self.width);
            let domains: Vec<Domain> = window.clone().map(|i| get_domain(&result, model, self.vars[i])).collect();
            let mandatory = domains.iter().filter(|d| d.singleton_value().map_or(false, |v| self.set.has(v))).count() as u32;
            let possible = domains.iter().filter(|d| !d.intersect(&self.set).is_empty()).count() as u32;

            if mandatory > self.hi {
                return Err(Conflict::new("sequence: window exceeds the maximum membership count"));
            }
            if possible < self.lo {
                return Err(Conflict::new("sequence: window cannot reach the minimum membership count"));
            }
            if mandatory == self.hi {
                for i in window.clone() {
                    let d = get_domain(&result, model, self.vars[i]);
                    if d.singleton_value().map_or(true, |v| !self.set.has(v)) && !d.intersect(&self.set).is_empty() {
                        let nd = d.intersect(&self.set.complement());
                        if nd.is_empty() {
                            return Err(Conflict::on_var(self.vars[i], "sequence: window max pruning emptied domain"));
                        }
                        result = set_domain(&result, self.vars[i], nd);
                        changed = true;
                    }
                }
            } else if possible == self.lo && self.lo > 0 {
                for i in window.clone() {
                    let d = get_domain(&result, model, self.vars[i]);
                    let in_set = !d.intersect(&self.set).is_empty();
                    if in_set && d.singleton_value().map_or(true, |v| !self.set.has(v)) {
                        let nd = d.intersect(&self.set);
                        result = set_domain(&result, self.vars[i], nd);
                        changed = true;
                    }
                }
            }
        }
        Ok((result, changed))
    }
}

/// Maximal-run-length filter for a single target value. Propagation
/// only enforces the upper bound locally; correctness of the lower
/// bound is still guaranteed because the full run-length check below
/// runs once every variable in scope is bound.
#[derive(Debug)]
pub struct Stretch {
    vars: Vec<VarId>,
    set: Domain,
    min_run: u32,
    max_run: u32,
}

impl Stretch {
    pub fn new(vars: Vec<VarId>, set: Domain, min_run: u32, max_run: u32) -> Stretch {
        Stretch { vars, set, min_run, max_run }
    }
}

impl Propagator for Stretch {
    fn variables(&self) -> Vec<VarId> {
        self.vars.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.vars.len();
        let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();

        let mut result = state.clone();
        let mut changed = false;
        for i in 0..n {
            if let Some(v) = domains[i].singleton_value() {
                if !self.set.has(v) {
                    continue;
                }
                let mut run_len = 1u32;
                let mut j = i;
                while j > 0 && domains[j - 1].singleton_value() == Some(v) {
                    j -= 1;
                    run_len += 1;
                }
                if run_len >= self.max_run && i + 1 < n {
                    let next = &domains[i + 1];
                    if next.has(v) {
                        let nd = next.remove(v);
                        if nd.is_empty() {
                            return Err(Conflict::on_var(self.vars[i + 1], "stretch: run-length cap emptied next domain"));
                        }
                        result = set_domain(&result, self.vars[i + 1], nd);
                        changed = true;
                    }
                }
            }
        }

        if domains.iter().all(|d| d.is_singleton()) {
            let values: Vec<u32> = domains.iter().map(|d| d.singleton_value().unwrap()).collect();
            let mut i = 0;
            while i < n {
                if self.set.has(values[i]) {
                    let mut j = i;
                    while j + 1 < n && values[j + 1] == values[i] {
                        j += 1;
                    }
                    let len = (j - i + 1) as u32;
                    if len < self.min_run || len > self.max_run {
                        return Err(Conflict::new("stretch: a completed run violates its length bound"));
                    }
                    i = j + 1;
                } else {
                    i += 1;
                }
            }
        }
        Ok((result, changed))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::fd::model::Model;
    use crate::fd::solver::fixed_point;
    use std::sync::Arc;

    #[test]
    fn window_forces_membership_once_possible_equals_lo() {
        let mut m = Model::new(3);
        let a = m.int_var_values([1], "a").unwrap();
        let b = m.int_var(1, 3, "b").unwrap();
        let c = m.int_var(2, 3, "c").unwrap();
        let set = Domain::singleton(1, 3);
        m.add_constraint(Arc::new(Sequence::new(vec![a, b, c], set, 3, 2, 3)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, b).to_vec(), vec![1]);
    }

    #[test]
    fn completed_run_past_max_is_a_conflict() {
        let mut m = Model::new(2);
        let a = m.int_var_values([1], "a").unwrap();
        let b = m.int_var_values([1], "b").unwrap();
        let c = m.int_var_values([1], "c").unwrap();
        let set = Domain::singleton(1, 2);
        m.add_constraint(Arc::new(Stretch::new(vec![a, b, c], set, 1, 2)));
        let ctx = CancellationToken::new();
        assert!(fixed_point(&m, None, &ctx).is_err());
    }
}
