//! `ElementValues(idx, values[], result)`: `result = values[idx]`,
//! 1-indexed, propagated bidirectionally (spec §4.4).
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct ElementValues {
    idx: VarId,
    values: Vec<u32>,
    result: VarId,
}

impl ElementValues {
    pub fn new(idx: VarId, values: Vec<u32>, result: VarId) -> ElementValues {
        ElementValues { idx, values, result }
    }
}

impl Propagator for ElementValues {
    fn variables(&self) -> Vec<VarId> {
        vec![self.idx, self.result]
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let d_idx = get_domain(state, model, self.idx);
        let d_res = get_domain(state, model, self.result);

        let mut allowed_result = Domain::empty(d_res.universe());
        for i in d_idx.iter() {
            if let Some(&v) = self.values.get((i - 1) as usize) {
                allowed_result = allowed_result.union(&Domain::singleton(v, d_res.universe()));
            }
        }
        let new_result = d_res.intersect(&allowed_result);
        if new_result.is_empty() {
            return Err(Conflict::on_var(self.result, "element: no reachable result value"));
        }

        let mut allowed_idx = Domain::empty(d_idx.universe());
        for (pos, &v) in self.values.iter().enumerate() {
            if new_result.has(v) {
                allowed_idx = allowed_idx.union(&Domain::singleton((pos + 1) as u32, d_idx.universe()));
            }
        }
        let new_idx = d_idx.intersect(&allowed_idx);
        if new_idx.is_empty() {
            return Err(Conflict::on_var(self.idx, "element: no index yields a live result value"));
        }

        let mut changed = false;
        let mut result = state.clone();
        if new_result != d_res {
            changed = true;
            result = set_domain(&result, self.result, new_result);
        }
        if new_idx != d_idx {
            changed = true;
            result = set_domain(&result, self.idx, new_idx);
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
    fn narrowing_idx_narrows_result() {
        let mut m = Model::new(10);
        let idx = m.int_var_values([1, 2], "idx").unwrap();
        let res = m.int_var(1, 10, "res").unwrap();
        m.add_constraint(Arc::new(ElementValues::new(idx, vec![5, 9, 7], res)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, res).to_vec(), vec![5, 9]);
    }

    #[test]
    fn narrowing_result_narrows_idx() {
        let mut m = Model::new(10);
        let idx = m.int_var(1, 3, "idx").unwrap();
        let res = m.int_var_values([5], "res").unwrap();
        m.add_constraint(Arc::new(ElementValues::new(idx, vec![5, 9, 5], res)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, idx).to_vec(), vec![1, 3]);
    }
}
