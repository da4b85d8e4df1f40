//! `Regular(vars, states, start, accept, delta)`: sequence accepted by
//! a DFA, via forward+backward layered arc consistency (spec §4.4).
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct Regular {
    vars: Vec<VarId>,
    num_states: u32,
    start: u32,
    accept: HashSet<u32>,
    delta: HashMap<(u32, u32), u32>,
}

impl Regular {
    pub fn new(vars: Vec<VarId>, num_states: u32, start: u32, accept: HashSet<u32>, delta: HashMap<(u32, u32), u32>) -> Regular {
        Regular {
            vars,
            num_states,
            start,
            accept,
            delta,
        }
    }
}

impl Propagator for Regular {
    fn variables(&self) -> Vec<VarId> {
        self.vars.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.vars.len();
        let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();

        let mut forward: Vec<HashSet<u32>> = vec![HashSet::new(); n + 1];
        forward[0].insert(self.start);
        for i in 0..n {
            let current: Vec<u32> = forward[i].iter().copied().collect();
            for s in current {
                for v in domains[i].iter() {
                    if let Some(&s2) = self.delta.get(&(s, v)) {
                        forward[i + 1].insert(s2);
                    }
                }
            }
        }

        let mut backward: Vec<HashSet<u32>> = vec![HashSet::new(); n + 1];
        for &s in &self.accept {
            backward[n].insert(s);
        }
        for i in (0..n).rev() {
            for s in 0..self.num_states {
                for v in domains[i].iter() {
                    if let Some(&s2) = self.delta.get(&(s, v)) {
                        if backward[i + 1].contains(&s2) {
                            backward[i].insert(s);
                        }
                    }
                }
            }
        }

        if !forward[0].iter().any(|s| backward[0].contains(s)) {
            return Err(Conflict::new("regular: no accepting run is reachable"));
        }

        let mut changed = false;
        let mut result = state.clone();
        for i in 0..n {
            let mut allowed = Domain::empty(domains[i].universe());
            for v in domains[i].iter() {
                let supported = forward[i].iter().any(|&s| self.delta.get(&(s, v)).map_or(false, |s2| backward[i + 1].contains(s2)));
                if supported {
                    allowed = allowed.union(&Domain::singleton(v, domains[i].universe()));
                }
            }
            let nd = domains[i].intersect(&allowed);
            if nd.is_empty() {
                return Err(Conflict::on_var(self.vars[i], "regular: position has no accepting transition"));
            }
            if nd != domains[i] {
                result = set_domain(&result, self.vars[i], nd);
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
    fn dfa_accepting_only_ababab_pattern() {
        // states: 0 start/"expect a", 1 "expect b"; values 1=a, 2=b.
        let mut delta = HashMap::new();
        delta.insert((0u32, 1u32), 1u32);
        delta.insert((1u32, 2u32), 0u32);
        let mut accept = HashSet::new();
        accept.insert(0u32);

        let mut m = Model::new(2);
        let v0 = m.int_var(1, 2, "v0").unwrap();
        let v1 = m.int_var(1, 2, "v1").unwrap();
        m.add_constraint(Arc::new(Regular::new(vec![v0, v1], 2, 0, accept, delta)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, v0).to_vec(), vec![1]);
        assert_eq!(get_domain(&state, &m, v1).to_vec(), vec![2]);
    }
}
