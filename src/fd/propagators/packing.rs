//! `BinPacking(items, sizes, capacities)`: per-bin bounds on load plus
//! item pruning (spec §4.4). `items[i]`'s domain ranges over bin ids
//! `1..=capacities.len()`.
use crate::error::{Conflict, ModelError, Result as CResult};
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct BinPacking {
    items: Vec<VarId>,
    sizes: Vec<u32>,
    capacities: Vec<u32>,
}

impl BinPacking {
    pub fn new(items: Vec<VarId>, sizes: Vec<u32>, capacities: Vec<u32>) -> CResult<BinPacking> {
        if items.len() != sizes.len() {
            return Err(ModelError::ArityMismatch {
                expected: items.len(),
                actual: sizes.len(),
            }
            .into());
        }
        Ok(BinPacking { items, sizes, capacities })
    }
}

impl Propagator for BinPacking {
    fn variables(&self) -> Vec<VarId> {
        self.items.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<_> = self.items.iter().map(|v| get_domain(state, model, *v)).collect();
        let num_bins = self.capacities.len();

        let mut mandatory_load = vec![0u32; num_bins + 1];
        for (i, d) in domains.iter().enumerate() {
            if let Some(b) = d.singleton_value() {
                mandatory_load[b as usize] += self.sizes[i];
            }
        }
        for bin in 1..=num_bins {
            if mandatory_load[bin] > self.capacities[bin - 1] {
                return Err(Conflict::new(format!("bin packing: bin {bin} mandatory load exceeds capacity")));
            }
        }

        let mut changed = false;
        let mut result = state.clone();
        for (i, d) in domains.iter().enumerate() {
            if d.is_singleton() {
                continue;
            }
            let mut nd = d.clone();
            for bin in d.to_vec() {
                if (bin as usize) <= num_bins && mandatory_load[bin as usize] + self.sizes[i] > self.capacities[bin as usize - 1] {
                    nd = nd.remove(bin);
                }
            }
            if nd.is_empty() {
                return Err(Conflict::on_var(self.items[i], "bin packing: no bin has room for this item"));
            }
            if nd != *d {
                result = set_domain(&result, self.items[i], nd);
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
    fn full_bin_is_removed_from_other_items_domains() {
        let mut m = Model::new(2);
        let a = m.int_var(1, 1, "a").unwrap();
        let b = m.int_var(1, 2, "b").unwrap();
        m.add_constraint(Arc::new(BinPacking::new(vec![a, b], vec![5, 3], vec![5, 10]).unwrap()));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, b).to_vec(), vec![2]);
    }
}
