//! `Reified(c, b)`: boolean `b` (1=false, 2=true) iff the wrapped
//! constraint holds, propagated in both directions by probing the
//! positive and negated propagators without committing to either until
//! one proves infeasible (spec §4.4).
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};
use std::sync::Arc;

pub const FALSE: u32 = 1;
pub const TRUE: u32 = 2;

#[derive(Debug)]
pub struct Reified {
    positive: Arc<dyn Propagator>,
    negative: Arc<dyn Propagator>,
    b: VarId,
}

impl Reified {
    pub fn new(positive: Arc<dyn Propagator>, negative: Arc<dyn Propagator>, b: VarId) -> Reified {
        Reified { positive, negative, b }
    }
}

impl Propagator for Reified {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.positive.variables();
        vs.extend(self.negative.variables());
        vs.push(self.b);
        vs.sort_unstable();
        vs.dedup();
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let db = get_domain(state, model, self.b);
        if let Some(v) = db.singleton_value() {
            return if v == TRUE {
                self.positive.propagate(model, state)
            } else {
                self.negative.propagate(model, state)
            };
        }

        let positive_feasible = self.positive.propagate(model, state).is_ok();
        let negative_feasible = self.negative.propagate(model, state).is_ok();
        match (positive_feasible, negative_feasible) {
            (false, false) => Err(Conflict::on_var(self.b, "reified: neither the constraint nor its negation is feasible")),
            (false, true) => {
                let nd = db.intersect(&Domain::singleton(FALSE, db.universe()));
                if nd.is_empty() {
                    return Err(Conflict::on_var(self.b, "reified: forcing false emptied the indicator's domain"));
                }
                Ok((set_domain(state, self.b, nd), true))
            }
            (true, false) => {
                let nd = db.intersect(&Domain::singleton(TRUE, db.universe()));
                if nd.is_empty() {
                    return Err(Conflict::on_var(self.b, "reified: forcing true emptied the indicator's domain"));
                }
                Ok((set_domain(state, self.b, nd), true))
            }
            (true, true) => Ok((state.clone(), false)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::fd::model::Model;
    use crate::fd::propagators::arithmetic::{Inequality, InequalityOp};
    use crate::fd::solver::fixed_point;
    use std::sync::Arc;

    #[test]
    fn disentailed_constraint_forces_indicator_false() {
        let mut m = Model::new(10);
        let x = m.int_var(5, 5, "x").unwrap();
        let y = m.int_var(1, 3, "y").unwrap();
        let b = m.int_var_values([FALSE, TRUE], "b").unwrap();
        let positive: Arc<dyn Propagator> = Arc::new(Inequality::new(x, y, InequalityOp::Le));
        let negative: Arc<dyn Propagator> = Arc::new(Inequality::new(x, y, InequalityOp::Gt));
        m.add_constraint(Arc::new(Reified::new(positive, negative, b)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, b).to_vec(), vec![FALSE]);
    }
}
