//! `Arithmetic(x, y, k)`: `y = x + k` under domain consistency, and
//! `Inequality(x, y, op)` under bounds consistency (spec §4.4).
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct Arithmetic {
    x: VarId,
    y: VarId,
    k: i64,
}

impl Arithmetic {
    pub fn new(x: VarId, y: VarId, k: i64) -> Arithmetic {
        Arithmetic { x, y, k }
    }
}

impl Propagator for Arithmetic {
    fn variables(&self) -> Vec<VarId> {
        vec![self.x, self.y]
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let dx = get_domain(state, model, self.x);
        let dy = get_domain(state, model, self.y);
        let universe = dx.universe() as i64;

        let mut new_x = Domain::empty(dx.universe());
        for v in dx.iter() {
            let yv = v as i64 + self.k;
            if yv >= 1 && yv <= universe && dy.has(yv as u32) {
                new_x = new_x.union(&Domain::singleton(v, dx.universe()));
            }
        }
        let mut new_y = Domain::empty(dy.universe());
        for v in dy.iter() {
            let xv = v as i64 - self.k;
            if xv >= 1 && xv <= universe && dx.has(xv as u32) {
                new_y = new_y.union(&Domain::singleton(v, dy.universe()));
            }
        }

        let mut changed = false;
        let mut result = state.clone();
        if new_x != dx {
            changed = true;
            result = set_domain(&result, self.x, new_x.clone());
        }
        if new_y != dy {
            changed = true;
            result = set_domain(&result, self.y, new_y.clone());
        }
        if new_x.is_empty() {
            return Err(Conflict::on_var(self.x, "arithmetic projection emptied domain"));
        }
        if new_y.is_empty() {
            return Err(Conflict::on_var(self.y, "arithmetic projection emptied domain"));
        }
        Ok((result, changed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InequalityOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

#[derive(Debug)]
pub struct Inequality {
    x: VarId,
    y: VarId,
    op: InequalityOp,
}

impl Inequality {
    pub fn new(x: VarId, y: VarId, op: InequalityOp) -> Inequality {
        Inequality { x, y, op }
    }
}

impl Propagator for Inequality {
    fn variables(&self) -> Vec<VarId> {
        vec![self.x, self.y]
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let dx = get_domain(state, model, self.x);
        let dy = get_domain(state, model, self.y);
        let (mut new_x, mut new_y) = (dx.clone(), dy.clone());

        match self.op {
            InequalityOp::Lt | InequalityOp::Le => {
                let slack = if self.op == InequalityOp::Lt { 1 } else { 0 };
                if let Some(ymax) = dy.max() {
                    if ymax >= slack {
                        new_x = new_x.remove_above(ymax - slack);
                    } else {
                        new_x = Domain::empty(dx.universe());
                    }
                }
                if let Some(xmin) = dx.min() {
                    new_y = new_y.remove_below(xmin + slack);
                }
            }
            InequalityOp::Gt | InequalityOp::Ge => {
                let slack = if self.op == InequalityOp::Gt { 1 } else { 0 };
                if let Some(ymin) = dy.min() {
                    new_x = new_x.remove_below(ymin + slack);
                }
                if let Some(xmax) = dx.max() {
                    if xmax >= slack {
                        new_y = new_y.remove_above(xmax - slack);
                    } else {
                        new_y = Domain::empty(dy.universe());
                    }
                }
            }
            InequalityOp::Ne => {
                if let Some(v) = dy.singleton_value() {
                    new_x = new_x.remove(v);
                }
                if let Some(v) = dx.singleton_value() {
                    new_y = new_y.remove(v);
                }
            }
        }

        let mut changed = false;
        let mut result = state.clone();
        if new_x != dx {
            changed = true;
            result = set_domain(&result, self.x, new_x.clone());
        }
        if new_y != dy {
            changed = true;
            result = set_domain(&result, self.y, new_y.clone());
        }
        if new_x.is_empty() {
            return Err(Conflict::on_var(self.x, "inequality pruned domain to empty"));
        }
        if new_y.is_empty() {
            return Err(Conflict::on_var(self.y, "inequality pruned domain to empty"));
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
    fn arithmetic_projects_both_directions() {
        let mut m = Model::new(10);
        let x = m.int_var(1, 5, "x").unwrap();
        let y = m.int_var(1, 10, "y").unwrap();
        m.add_constraint(Arc::new(Arithmetic::new(x, y, 3)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, y).to_vec(), vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn strict_less_than_shrinks_bounds() {
        let mut m = Model::new(10);
        let x = m.int_var(1, 10, "x").unwrap();
        let y = m.int_var(1, 3, "y").unwrap();
        m.add_constraint(Arc::new(Inequality::new(x, y, InequalityOp::Lt)));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, x).max(), Some(2));
    }
}
