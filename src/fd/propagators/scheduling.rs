//! `NoOverlap(starts, durations)` and `Diffn(xs, ys, ws, hs)`:
//! disjunctive scheduling and 2-D rectangle packing, both propagated
//! through pairwise disjunctive reasoning — for each pair, if one
//! ordering is already infeasible the other is enforced as a bound
//! (spec §4.4).
use crate::error::Conflict;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

/// `before_feasible(a, dur_a, b) == true` iff some placement exists
/// with task `a` entirely before task `b`.
fn before_feasible(da_min: u32, dur_a: u32, db_max: u32) -> bool {
    da_min + dur_a <= db_max
}

/// Enforce "a strictly before b" as a bound: `a + dur_a <= b`.
fn enforce_before(
    model: &Model,
    state: &MaybeState,
    a: VarId,
    dur_a: u32,
    b: VarId,
) -> Result<(MaybeState, bool), Conflict> {
    let da = get_domain(state, model, a);
    let db = get_domain(state, model, b);
    let new_da = if db.max().unwrap() >= dur_a {
        da.remove_above(db.max().unwrap() - dur_a)
    } else {
        crate::fd::domain::Domain::empty(da.universe())
    };
    let new_db = db.remove_below(da.min().unwrap() + dur_a);
    if new_da.is_empty() {
        return Err(Conflict::on_var(a, "scheduling: no placement keeps this task before the other"));
    }
    if new_db.is_empty() {
        return Err(Conflict::on_var(b, "scheduling: no placement keeps the other task after this one"));
    }
    let mut changed = false;
    let mut result: MaybeState = state.clone();
    if new_da != da {
        result = set_domain(&result, a, new_da);
        changed = true;
    }
    if new_db != db {
        result = set_domain(&result, b, new_db);
        changed = true;
    }
    Ok((result, changed))
}

fn pairwise_disjoint(model: &Model, state: &MaybeState, a: VarId, dur_a: u32, b: VarId, dur_b: u32) -> Result<(MaybeState, bool), Conflict> {
    let da = get_domain(state, model, a);
    let db = get_domain(state, model, b);
    let a_before_b = before_feasible(da.min().unwrap(), dur_a, db.max().unwrap());
    let b_before_a = before_feasible(db.min().unwrap(), dur_b, da.max().unwrap());
    match (a_before_b, b_before_a) {
        (false, false) => Err(Conflict::new("scheduling: neither ordering is feasible for this pair")),
        (true, false) => enforce_before(model, state, a, dur_a, b),
        (false, true) => enforce_before(model, state, b, dur_b, a),
        (true, true) => Ok((state.clone(), false)),
    }
}

#[derive(Debug)]
pub struct NoOverlap {
    starts: Vec<VarId>,
    durations: Vec<u32>,
}

impl NoOverlap {
    pub fn new(starts: Vec<VarId>, durations: Vec<u32>) -> NoOverlap {
        NoOverlap { starts, durations }
    }
}

impl Propagator for NoOverlap {
    fn variables(&self) -> Vec<VarId> {
        self.starts.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.starts.len();
        let mut result = state.clone();
        let mut changed = false;
        for i in 0..n {
            for j in (i + 1)..n {
                let (new_state, did_change) =
                    pairwise_disjoint(model, &result, self.starts[i], self.durations[i], self.starts[j], self.durations[j])?;
                result = new_state;
                changed = changed || did_change;
            }
        }
        Ok((result, changed))
    }
}

/// `dur`-annotated compulsory interval overlap test in one axis.
fn forced_overlap(model: &Model, state: &MaybeState, a: VarId, dur_a: u32, b: VarId, dur_b: u32) -> bool {
    let da = get_domain(state, model, a);
    let db = get_domain(state, model, b);
    match (da.singleton_value(), db.singleton_value()) {
        (Some(sa), Some(sb)) => sa < sb + dur_b && sb < sa + dur_a,
        _ => false,
    }
}

#[derive(Debug)]
pub struct Diffn {
    xs: Vec<VarId>,
    ys: Vec<VarId>,
    ws: Vec<u32>,
    hs: Vec<u32>,
}

impl Diffn {
    pub fn new(xs: Vec<VarId>, ys: Vec<VarId>, ws: Vec<u32>, hs: Vec<u32>) -> Diffn {
        Diffn { xs, ys, ws, hs }
    }
}

impl Propagator for Diffn {
    fn variables(&self) -> Vec<VarId> {
        self.xs.iter().chain(self.ys.iter()).cloned().collect()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.xs.len();
        let mut result = state.clone();
        let mut changed = false;
        for i in 0..n {
            for j in (i + 1)..n {
                if forced_overlap(model, &result, self.ys[i], self.hs[i], self.ys[j], self.hs[j]) {
                    let (new_state, did_change) = pairwise_disjoint(model, &result, self.xs[i], self.ws[i], self.xs[j], self.ws[j])?;
                    result = new_state;
                    changed = changed || did_change;
                } else if forced_overlap(model, &result, self.xs[i], self.ws[i], self.xs[j], self.ws[j]) {
                    let (new_state, did_change) = pairwise_disjoint(model, &result, self.ys[i], self.hs[i], self.ys[j], self.hs[j])?;
                    result = new_state;
                    changed = changed || did_change;
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
    fn one_feasible_ordering_is_enforced() {
        let mut m = Model::new(10);
        let a = m.int_var(1, 1, "a").unwrap();
        let b = m.int_var(1, 10, "b").unwrap();
        m.add_constraint(Arc::new(NoOverlap::new(vec![a, b], vec![3, 2])));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, b).min(), Some(4));
    }
}
