//! `Table(vars, rows)`: generalised arc consistency by per-position
//! support enumeration (spec §4.4).
use crate::error::{Conflict, ModelError, Result as CResult};
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct Table {
    vars: Vec<VarId>,
    rows: Vec<Vec<u32>>,
}

impl Table {
    pub fn new(vars: Vec<VarId>, rows: Vec<Vec<u32>>) -> CResult<Table> {
        for row in &rows {
            if row.len() != vars.len() {
                return Err(ModelError::ArityMismatch {
                    expected: vars.len(),
                    actual: row.len(),
                }
                .into());
            }
        }
        Ok(Table { vars, rows })
    }
}

impl Propagator for Table {
    fn variables(&self) -> Vec<VarId> {
        self.vars.clone()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();

        let supported: Vec<&Vec<u32>> = self
            .rows
            .iter()
            .filter(|row| row.iter().zip(&domains).all(|(val, d)| d.has(*val)))
            .collect();
        if supported.is_empty() {
            return Err(Conflict::new("table: no row is supported by the current domains"));
        }

        let mut changed = false;
        let mut result = state.clone();
        for (i, v) in self.vars.iter().enumerate() {
            let mut allowed = Domain::empty(domains[i].universe());
            for row in &supported {
                allowed = allowed.union(&Domain::singleton(row[i], domains[i].universe()));
            }
            let nd = domains[i].intersect(&allowed);
            if nd.is_empty() {
                return Err(Conflict::on_var(*v, "table: position has no supported value"));
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
    fn restricts_to_rows_with_support() {
        let mut m = Model::new(3);
        let a = m.int_var(1, 3, "a").unwrap();
        let b = m.int_var_values([2], "b").unwrap();
        m.add_constraint(Arc::new(Table::new(vec![a, b], vec![vec![1, 2], vec![3, 2], vec![1, 1]]).unwrap()));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, a).to_vec(), vec![1, 3]);
    }
}
