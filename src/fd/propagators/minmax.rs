//! `Min`/`Max(vars, r)`: `r = min(vars)` or `r = max(vars)` under
//! bounds consistency (spec §4.4).
use crate::error::Conflict;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct MinOf {
    vars: Vec<VarId>,
    r: VarId,
}

impl MinOf {
    pub fn new(vars: Vec<VarId>, r: VarId) -> MinOf {
        MinOf { vars, r }
    }
}

impl Propagator for MinOf {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.vars.clone();
        vs.push(self.r);
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<_> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();
        let dr = get_domain(state, model, self.r);

        let r_lo = domains.iter().map(|d| d.min().unwrap()).min().unwrap();
        let r_hi = domains.iter().map(|d| d.max().unwrap()).min().unwrap();
        let new_r = dr.remove_below(r_lo).remove_above(r_hi);
        if new_r.is_empty() {
            return Err(Conflict::on_var(self.r, "min: attainable range excludes r's domain"));
        }
        let mut changed = new_r != dr;
        let mut result = state.clone();
        if changed {
            result = set_domain(&result, self.r, new_r);
        }

        let r_min = get_domain(&result, model, self.r).min().unwrap();
        for (i, v) in self.vars.iter().enumerate() {
            let nd = domains[i].remove_below(r_min);
            if nd.is_empty() {
                return Err(Conflict::on_var(*v, "min: variable cannot reach r's lower bound"));
            }
            if nd != domains[i] {
                result = set_domain(&result, *v, nd);
                changed = true;
            }
        }
        Ok((result, changed))
    }
}

#[derive(Debug)]
pub struct MaxOf {
    vars: Vec<VarId>,
    r: VarId,
}

impl MaxOf {
    pub fn new(vars: Vec<VarId>, r: VarId) -> MaxOf {
        MaxOf { vars, r }
    }
}

impl Propagator for MaxOf {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.vars.clone();
        vs.push(self.r);
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<_> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();
        let dr = get_domain(state, model, self.r);

        let r_lo = domains.iter().map(|d| d.min().unwrap()).max().unwrap();
        let r_hi = domains.iter().map(|d| d.max().unwrap()).max().unwrap();
        let new_r = dr.remove_below(r_lo).remove_above(r_hi);
        if new_r.is_empty() {
            return Err(Conflict::on_var(self.r, "max: attainable range excludes r's domain"));
        }
        let mut changed = new_r != dr;
        let mut result = state.clone();
        if changed {
            result = set_domain(&result, self.r, new_r);
        }

        let r_max = get_domain(&result, model, self.r).max().unwrap();
        for (i, v) in self.vars.iter().enumerate() {
            let nd = domains[i].remove_above(r_max);
            if nd.is_empty() {
                return Err(Conflict::on_var(*v, "max: variable cannot reach r's upper bound"));
            }
            if nd != domains[i] {
                result = set_domain(&result, *v, nd);
                changed = true;
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
    fn min_of_forces_vars_above_its_lower_bound() {
        let mut m = Model::new(10);
        let a = m.int_var(3, 7, "a").unwrap();
        let b = m.int_var(5, 9, "b").unwrap();
        let r = m.int_var_values([5], "r").unwrap();
        m.add_constraint(Arc::new(MinOf::new(vec![a, b], r)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, a).min(), Some(5));
    }
}
