//! `NValue`/`AtMostNValues`/`AtLeastNValues(vars, k)`: the number of
//! distinct values among `vars` compared against `k` (spec §4.4).
use crate::error::Conflict;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NValueOp {
    Eq,
    AtMost,
    AtLeast,
}

#[derive(Debug)]
pub struct NValue {
    vars: Vec<VarId>,
    k: VarId,
    op: NValueOp,
}

impl NValue {
    pub fn new(vars: Vec<VarId>, k: VarId, op: NValueOp) -> NValue {
        NValue { vars, k, op }
    }
}

impl Propagator for NValue {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.vars.clone();
        vs.push(self.k);
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<_> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();
        let dk = get_domain(state, model, self.k);

        let singleton_values: HashSet<u32> = domains.iter().filter_map(|d| d.singleton_value()).collect();
        let mut union_values: HashSet<u32> = HashSet::new();
        for d in &domains {
            for v in d.iter() {
                union_values.insert(v);
            }
        }
        let min_possible = if singleton_values.is_empty() && !self.vars.is_empty() {
            1
        } else {
            singleton_values.len() as u32
        };
        let max_possible = (union_values.len() as u32).min(self.vars.len() as u32);

        let new_k = match self.op {
            NValueOp::Eq => dk.remove_below(min_possible).remove_above(max_possible),
            NValueOp::AtMost => dk.remove_below(min_possible),
            NValueOp::AtLeast => dk.remove_above(max_possible),
        };
        if new_k.is_empty() {
            return Err(Conflict::on_var(self.k, "nvalue: attainable distinct-value range excludes k"));
        }
        let mut result = state.clone();
        let changed = new_k != dk;
        if changed {
            result = set_domain(&result, self.k, new_k);
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
    fn eq_bounds_k_by_possible_distinct_values() {
        let mut m = Model::new(5);
        let a = m.int_var(1, 1, "a").unwrap();
        let b = m.int_var(2, 3, "b").unwrap();
        let c = m.int_var(2, 3, "c").unwrap();
        let k = m.int_var(1, 5, "k").unwrap();
        m.add_constraint(Arc::new(NValue::new(vec![a, b, c], k, NValueOp::Eq)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, k).to_vec(), vec![1, 2, 3]);
    }
}
