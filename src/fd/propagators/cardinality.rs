//! `GlobalCardinality`, `Count`, and `Among` (spec §4.4): all three
//! bound how many of a variable group land in (or on) a target value
//! or set, tightened via bounds consistency plus forced pruning once
//! the attainable count collapses to its bound.
//!
//! `Count`/`Among`'s cardinality variable `k` is encoded as
//! `actual_count + 1`, matching spec §4.4's note on `Among` ("k is
//! itself a variable, typically encoded as count+1") — `Domain` has no
//! representable zero value (spec §3), so a count that can legitimately
//! be zero needs the shift.
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};
use std::collections::HashMap;

#[derive(Debug)]
pub struct GlobalCardinality {
    vars: Vec<VarId>,
    counts: HashMap<u32, (u32, u32)>,
}

impl GlobalCardinality {
    pub fn new(vars: Vec<VarId>, counts: HashMap<u32, (u32, u32)>) -> GlobalCardinality {
        GlobalCardinality { vars, counts }
    }
}

impl Propagator for GlobalCardinality {
    fn variables(&self) -> Vec<VarId> {
        self.vars.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let mut result = state.clone();
        let mut changed = false;

        let mut values: Vec<u32> = self.counts.keys().copied().collect();
        values.sort_unstable();
        for value in values {
            let (lo, hi) = self.counts[&value];
            let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(&result, model, *v)).collect();
            let mandatory = domains.iter().filter(|d| d.singleton_value() == Some(value)).count() as u32;
            let possible = domains.iter().filter(|d| d.has(value)).count() as u32;

            if mandatory > hi {
                return Err(Conflict::new(format!("gcc: value {value} mandatory count {mandatory} exceeds max {hi}")));
            }
            if possible < lo {
                return Err(Conflict::new(format!("gcc: value {value} possible count {possible} below min {lo}")));
            }
            if mandatory == hi {
                for (i, d) in domains.iter().enumerate() {
                    if d.singleton_value() != Some(value) && d.has(value) {
                        let nd = d.remove(value);
                        if nd.is_empty() {
                            return Err(Conflict::on_var(self.vars[i], "gcc: max-count pruning emptied domain"));
                        }
                        result = set_domain(&result, self.vars[i], nd);
                        changed = true;
                    }
                }
            } else if possible == lo && lo > 0 {
                for (i, d) in domains.iter().enumerate() {
                    if d.has(value) && d.singleton_value() != Some(value) {
                        result = set_domain(&result, self.vars[i], Domain::singleton(value, d.universe()));
                        changed = true;
                    }
                }
            }
        }
        Ok((result, changed))
    }
}

#[derive(Debug)]
pub struct Count {
    vars: Vec<VarId>,
    target: u32,
    k: VarId,
}

impl Count {
    pub fn new(vars: Vec<VarId>, target: u32, k: VarId) -> Count {
        Count { vars, target, k }
    }
}

impl Propagator for Count {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.vars.clone();
        vs.push(self.k);
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();
        let dk = get_domain(state, model, self.k);
        let mandatory = domains.iter().filter(|d| d.singleton_value() == Some(self.target)).count() as u32;
        let possible = domains.iter().filter(|d| d.has(self.target)).count() as u32;

        let new_k = dk.intersect(&Domain::from_range(mandatory + 1, possible + 1, dk.universe()));
        if new_k.is_empty() {
            return Err(Conflict::on_var(self.k, "count: attainable range excludes k's domain"));
        }
        let k_min = new_k.min().unwrap() - 1;
        let k_max = new_k.max().unwrap() - 1;

        let mut changed = new_k != dk;
        let mut result = state.clone();
        if changed {
            result = set_domain(&result, self.k, new_k);
        }

        if k_max == mandatory {
            for (i, d) in domains.iter().enumerate() {
                if d.singleton_value() != Some(self.target) && d.has(self.target) {
                    let nd = d.remove(self.target);
                    if nd.is_empty() {
                        return Err(Conflict::on_var(self.vars[i], "count: forcing k's max emptied a domain"));
                    }
                    result = set_domain(&result, self.vars[i], nd);
                    changed = true;
                }
            }
        } else if k_min == possible && k_min > 0 {
            for (i, d) in domains.iter().enumerate() {
                if d.has(self.target) && d.singleton_value() != Some(self.target) {
                    result = set_domain(&result, self.vars[i], Domain::singleton(self.target, d.universe()));
                    changed = true;
                }
            }
        }
        Ok((result, changed))
    }
}

#[derive(Debug)]
pub struct Among {
    vars: Vec<VarId>,
    set: Domain,
    k: VarId,
}

impl Among {
    pub fn new(vars: Vec<VarId>, set: Domain, k: VarId) -> Among {
        Among { vars, set, k }
    }
}

impl Propagator for Among {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.vars.clone();
        vs.push(self.k);
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();
        let dk = get_domain(state, model, self.k);

        let is_mandatory = |d: &Domain| d.singleton_value().map_or(false, |v| self.set.has(v));
        let is_possible = |d: &Domain| !d.intersect(&self.set).is_empty();

        let mandatory = domains.iter().filter(|d| is_mandatory(d)).count() as u32;
        let possible = domains.iter().filter(|d| is_possible(d)).count() as u32;

        let new_k = dk.intersect(&Domain::from_range(mandatory + 1, possible + 1, dk.universe()));
        if new_k.is_empty() {
            return Err(Conflict::on_var(self.k, "among: attainable range excludes k's domain"));
        }
        let k_min = new_k.min().unwrap() - 1;
        let k_max = new_k.max().unwrap() - 1;

        let mut changed = new_k != dk;
        let mut result = state.clone();
        if changed {
            result = set_domain(&result, self.k, new_k);
        }

        if k_max == mandatory {
            for (i, d) in domains.iter().enumerate() {
                if !is_mandatory(d) && is_possible(d) {
                    let nd = d.intersect(&self.set.complement());
                    if nd.is_empty() {
                        return Err(Conflict::on_var(self.vars[i], "among: forcing k's max emptied a domain"));
                    }
                    result = set_domain(&result, self.vars[i], nd);
                    changed = true;
                }
            }
        } else if k_min == possible && k_min > 0 {
            for (i, d) in domains.iter().enumerate() {
                if is_possible(d) && !is_mandatory(d) {
                    let nd = d.intersect(&self.set);
                    result = set_domain(&result, self.vars[i], nd);
                    changed = true;
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
    fn gcc_forces_remaining_vars_once_max_reached() {
        let mut m = Model::new(3);
        let a = m.int_var(1, 1, "a").unwrap();
        let b = m.int_var(1, 1, "b").unwrap();
        let c = m.int_var(1, 3, "c").unwrap();
        let mut counts = HashMap::new();
        counts.insert(1u32, (0u32, 2u32));
        m.add_constraint(Arc::new(GlobalCardinality::new(vec![a, b, c], counts)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert!(!get_domain(&state, &m, c).has(1));
    }

    #[test]
    fn count_bounds_k_to_attainable_range() {
        let mut m = Model::new(4);
        let a = m.int_var(1, 1, "a").unwrap();
        let b = m.int_var(1, 2, "b").unwrap();
        let c = m.int_var(2, 2, "c").unwrap();
        let k = m.int_var(1, 4, "k").unwrap();
        m.add_constraint(Arc::new(Count::new(vec![a, b, c], 1, k)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        // mandatory=1 (a), possible=2 (a,b) -> k-1 in [1,2] -> k in [2,3]
        assert_eq!(get_domain(&state, &m, k).to_vec(), vec![2, 3]);
    }
}
