//! `Circuit(succ[1..n])`: a single Hamiltonian cycle over `succ`, via
//! self-loop removal, mutual exclusion across the permutation, and
//! subtour elimination with order variables `u` (spec §4.4).
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct Circuit {
    succ: Vec<VarId>,
    order: Vec<VarId>,
    start: usize,
}

impl Circuit {
    pub fn new(succ: Vec<VarId>, order: Vec<VarId>, start: usize) -> Circuit {
        Circuit { succ, order, start }
    }
}

impl Propagator for Circuit {
    fn variables(&self) -> Vec<VarId> {
        self.succ.iter().chain(self.order.iter()).cloned().collect()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.succ.len();
        let mut result = state.clone();
        let mut changed = false;

        for (i, &s) in self.succ.iter().enumerate() {
            let d = get_domain(&result, model, s);
            let self_value = (i + 1) as u32;
            if d.has(self_value) {
                let nd = d.remove(self_value);
                if nd.is_empty() {
                    return Err(Conflict::on_var(s, "circuit: removing self-loop emptied domain"));
                }
                result = set_domain(&result, s, nd);
                changed = true;
            }
        }

        let singles: Vec<Option<u32>> = self.succ.iter().map(|&s| get_domain(&result, model, s).singleton_value()).collect();
        for (i, &s) in self.succ.iter().enumerate() {
            let d = get_domain(&result, model, s);
            if d.is_singleton() {
                continue;
            }
            let mut nd = d.clone();
            for (j, sv) in singles.iter().enumerate() {
                if j != i {
                    if let Some(v) = sv {
                        nd = nd.remove(*v);
                    }
                }
            }
            if nd.is_empty() {
                return Err(Conflict::on_var(s, "circuit: permutation exclusion emptied domain"));
            }
            if nd != d {
                result = set_domain(&result, s, nd);
                changed = true;
            }
        }

        let start_order = self.order[self.start];
        let d_start = get_domain(&result, model, start_order);
        let forced_one = d_start.intersect(&Domain::singleton(1, d_start.universe()));
        if forced_one.is_empty() {
            return Err(Conflict::on_var(start_order, "circuit: start position must be order 1"));
        }
        if forced_one != d_start {
            result = set_domain(&result, start_order, forced_one);
            changed = true;
        }

        for (i, &s) in self.succ.iter().enumerate() {
            let ds = get_domain(&result, model, s);
            if let Some(v) = ds.singleton_value() {
                let j = (v - 1) as usize;
                if j == self.start {
                    continue;
                }
                let ui = self.order[i];
                let uj = self.order[j];
                let dui = get_domain(&result, model, ui);
                let duj = get_domain(&result, model, uj);
                let mut allowed_uj = Domain::empty(duj.universe());
                for p in dui.iter() {
                    let np = p + 1;
                    if np <= n as u32 {
                        allowed_uj = allowed_uj.union(&Domain::singleton(np, duj.universe()));
                    }
                }
                let new_uj = duj.intersect(&allowed_uj);
                if new_uj.is_empty() {
                    return Err(Conflict::on_var(uj, "circuit: order propagation emptied domain"));
                }
                if new_uj != duj {
                    result = set_domain(&result, uj, new_uj);
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
    fn self_loops_are_removed() {
        let mut m = Model::new(3);
        let s0 = m.int_var(1, 3, "s0").unwrap();
        let s1 = m.int_var(1, 3, "s1").unwrap();
        let s2 = m.int_var(1, 3, "s2").unwrap();
        let u0 = m.int_var(1, 3, "u0").unwrap();
        let u1 = m.int_var(1, 3, "u1").unwrap();
        let u2 = m.int_var(1, 3, "u2").unwrap();
        m.add_constraint(Arc::new(Circuit::new(vec![s0, s1, s2], vec![u0, u1, u2], 0)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert!(!get_domain(&state, &m, s0).has(1));
        assert_eq!(get_domain(&state, &m, u0).to_vec(), vec![1]);
    }
}
