//! `Cumulative(starts, durations, demands, capacity)`: time-table
//! filtering using compulsory parts `[start_max, start_min+duration)`
//! (spec §4.4).
use crate::error::{Conflict, ModelError, Result as CResult};
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct Cumulative {
    starts: Vec<VarId>,
    durations: Vec<u32>,
    demands: Vec<u32>,
    capacity: u32,
}

impl Cumulative {
    pub fn new(starts: Vec<VarId>, durations: Vec<u32>, demands: Vec<u32>, capacity: u32) -> CResult<Cumulative> {
        if starts.len() != durations.len() || starts.len() != demands.len() {
            return Err(ModelError::ArityMismatch {
                expected: starts.len(),
                actual: durations.len().min(demands.len()),
            }
            .into());
        }
        Ok(Cumulative {
            starts,
            durations,
            demands,
            capacity,
        })
    }
}

impl Propagator for Cumulative {
    fn variables(&self) -> Vec<VarId> {
        self.starts.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.starts.len();
        let domains: Vec<_> = self.starts.iter().map(|v| get_domain(state, model, *v)).collect();
        let universe = domains.iter().map(|d| d.universe()).max().unwrap_or(0);

        let mut mandatory = vec![0u32; (universe + 1) as usize];
        let mut compulsory: Vec<Option<(u32, u32)>> = Vec::with_capacity(n);
        for i in 0..n {
            let d = &domains[i];
            let smin = d.min().unwrap();
            let smax = d.max().unwrap();
            let dur = self.durations[i];
            if smax < smin + dur {
                let (lo, hi) = (smax, smin + dur);
                compulsory.push(Some((lo, hi)));
                for t in lo..hi {
                    if (t as usize) < mandatory.len() {
                        mandatory[t as usize] += self.demands[i];
                    }
                }
            } else {
                compulsory.push(None);
            }
        }
        for load in &mandatory {
            if *load > self.capacity {
                return Err(Conflict::new("cumulative: mandatory demand exceeds capacity"));
            }
        }

        let mut changed = false;
        let mut result = state.clone();
        for i in 0..n {
            let d = &domains[i];
            let dur = self.durations[i];
            let demand_i = self.demands[i];
            let mut nd = d.clone();
            for s in d.to_vec() {
                let mut ok = s + dur <= universe + 1;
                if ok {
                    for t in s..s + dur {
                        let mut load = mandatory[t as usize];
                        if let Some((lo, hi)) = compulsory[i] {
                            if t >= lo && t < hi {
                                load -= demand_i;
                            }
                        }
                        if load + demand_i > self.capacity {
                            ok = false;
                            break;
                        }
                    }
                }
                if !ok {
                    nd = nd.remove(s);
                }
            }
            if nd.is_empty() {
                return Err(Conflict::on_var(self.starts[i], "cumulative: time-table pruning emptied domain"));
            }
            if nd != *d {
                result = set_domain(&result, self.starts[i], nd);
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
    fn fixed_saturating_task_forces_the_other_to_start_after_it() {
        let mut m = Model::new(6);
        let a = m.int_var(2, 2, "a").unwrap();
        let b = m.int_var(1, 4, "b").unwrap();
        m.add_constraint(Arc::new(Cumulative::new(vec![a, b], vec![2, 2], vec![2, 1], 2).unwrap()));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, b).to_vec(), vec![4]);
    }
}
