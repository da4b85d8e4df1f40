//! `AllDifferent`: generalised arc consistency via maximum bipartite
//! matching and SCC-based edge removal (Régin's algorithm), as the
//! consistency column of spec §4.4 requires. Generalises the
//! singleton-elimination shape of
//! `plico::solver::constraints::all_different::AllDifferentConstraint`
//! into full GAC.
use crate::error::Conflict;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AllDifferent {
    vars: Vec<VarId>,
}

impl AllDifferent {
    pub fn new(vars: Vec<VarId>) -> AllDifferent {
        AllDifferent { vars }
    }
}

/// Kuhn's augmenting-path matching: try to match variable `i` to some
/// value in its domain, rerouting previously matched values.
fn try_kuhn(i: usize, adj: &[Vec<usize>], visited: &mut [bool], match_value: &mut [Option<usize>]) -> bool {
    for &j in &adj[i] {
        if !visited[j] {
            visited[j] = true;
            if match_value[j].map_or(true, |prev| try_kuhn(prev, adj, visited, match_value)) {
                match_value[j] = Some(i);
                return true;
            }
        }
    }
    false
}

impl Propagator for AllDifferent {
    fn variables(&self) -> Vec<VarId> {
        self.vars.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<_> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();

        let mut values: Vec<u32> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for d in &domains {
            for v in d.iter() {
                if seen.insert(v) {
                    values.push(v);
                }
            }
        }
        values.sort_unstable();
        let value_index: HashMap<u32, usize> = values.iter().enumerate().map(|(i, v)| (*v, i)).collect();

        let n = self.vars.len();
        let m = values.len();
        let adj: Vec<Vec<usize>> = domains.iter().map(|d| d.iter().map(|v| value_index[&v]).collect()).collect();

        let mut match_value: Vec<Option<usize>> = vec![None; m];
        let mut match_var: Vec<Option<usize>> = vec![None; n];
        for i in 0..n {
            let mut visited = vec![false; m];
            if !try_kuhn(i, &adj, &mut visited, &mut match_value) {
                return Err(Conflict::new("all-different has no perfect matching"));
            }
        }
        for (j, owner) in match_value.iter().enumerate() {
            if let Some(i) = owner {
                match_var[*i] = Some(j);
            }
        }

        let mut g = DiGraph::<(), ()>::new();
        let var_nodes: Vec<NodeIndex> = (0..n).map(|_| g.add_node(())).collect();
        let val_nodes: Vec<NodeIndex> = (0..m).map(|_| g.add_node(())).collect();
        for i in 0..n {
            let matched = match_var[i].unwrap();
            for &j in &adj[i] {
                if j == matched {
                    g.add_edge(val_nodes[j], var_nodes[i], ());
                } else {
                    g.add_edge(var_nodes[i], val_nodes[j], ());
                }
            }
        }
        let free: Vec<usize> = (0..m).filter(|j| match_value[*j].is_none()).collect();
        for w in free.windows(2) {
            g.add_edge(val_nodes[w[0]], val_nodes[w[1]], ());
            g.add_edge(val_nodes[w[1]], val_nodes[w[0]], ());
        }

        let sccs = tarjan_scc(&g);
        let mut scc_of = vec![0usize; n + m];
        for (idx, comp) in sccs.iter().enumerate() {
            for node in comp {
                scc_of[node.index()] = idx;
            }
        }

        let mut changed = false;
        let mut result = state.clone();
        for i in 0..n {
            let matched = match_var[i].unwrap();
            let mut domain = domains[i].clone();
            for &j in &adj[i] {
                if j == matched {
                    continue;
                }
                if scc_of[var_nodes[i].index()] != scc_of[val_nodes[j].index()] {
                    domain = domain.remove(values[j]);
                }
            }
            if domain != domains[i] {
                changed = true;
                result = set_domain(&result, self.vars[i], domain);
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
    fn two_vars_sharing_a_singleton_prune_the_third() {
        let mut m = Model::new(3);
        let a = m.int_var(1, 1, "a").unwrap();
        let b = m.int_var(2, 2, "b").unwrap();
        let c = m.int_var(1, 3, "c").unwrap();
        m.add_constraint(Arc::new(AllDifferent::new(vec![a, b, c])));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, c).to_vec(), vec![3]);
    }

    #[test]
    fn overconstrained_is_a_conflict() {
        let mut m = Model::new(2);
        let a = m.int_var(1, 2, "a").unwrap();
        let b = m.int_var(1, 2, "b").unwrap();
        let c = m.int_var(1, 2, "c").unwrap();
        m.add_constraint(Arc::new(AllDifferent::new(vec![a, b, c])));
        let ctx = CancellationToken::new();
        assert!(fixed_point(&m, None, &ctx).is_err());
    }
}
