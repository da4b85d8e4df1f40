//! `LexLess` / `LexLessEq(x[], y[])`: bounds consistency on the first
//! differing position (spec §4.4).
use crate::error::{Conflict, ModelError, Result as CResult};
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};

#[derive(Debug)]
pub struct Lex {
    xs: Vec<VarId>,
    ys: Vec<VarId>,
    strict: bool,
}

impl Lex {
    pub fn new(xs: Vec<VarId>, ys: Vec<VarId>, strict: bool) -> CResult<Lex> {
        if xs.len() != ys.len() {
            return Err(ModelError::ArityMismatch {
                expected: xs.len(),
                actual: ys.len(),
            }
            .into());
        }
        Ok(Lex { xs, ys, strict })
    }
}

impl Propagator for Lex {
    fn variables(&self) -> Vec<VarId> {
        self.xs.iter().chain(self.ys.iter()).cloned().collect()
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let n = self.xs.len();
        let xd: Vec<Domain> = self.xs.iter().map(|v| get_domain(state, model, *v)).collect();
        let yd: Vec<Domain> = self.ys.iter().map(|v| get_domain(state, model, *v)).collect();

        let mut alpha = 0;
        while alpha < n {
            match (xd[alpha].singleton_value(), yd[alpha].singleton_value()) {
                (Some(a), Some(b)) if a == b => alpha += 1,
                _ => break,
            }
        }

        if alpha == n {
            if self.strict {
                return Err(Conflict::new("lex: sequences are equal but a strict order was required"));
            }
            return Ok((state.clone(), false));
        }

        let dx = &xd[alpha];
        let dy = &yd[alpha];
        let strict_here = self.strict && alpha == n - 1;

        let (new_dx, new_dy) = if strict_here {
            let ymax = dy.max().unwrap();
            let xmin = dx.min().unwrap();
            let new_dx = if ymax == 0 { Domain::empty(dx.universe()) } else { dx.remove_above(ymax - 1) };
            let new_dy = dy.remove_below(xmin + 1);
            (new_dx, new_dy)
        } else {
            (dx.remove_above(dy.max().unwrap()), dy.remove_below(dx.min().unwrap()))
        };

        if new_dx.is_empty() {
            return Err(Conflict::on_var(self.xs[alpha], "lex: first differing position has no feasible x value"));
        }
        if new_dy.is_empty() {
            return Err(Conflict::on_var(self.ys[alpha], "lex: first differing position has no feasible y value"));
        }

        let mut changed = false;
        let mut result = state.clone();
        if new_dx != *dx {
            changed = true;
            result = set_domain(&result, self.xs[alpha], new_dx);
        }
        if new_dy != *dy {
            changed = true;
            result = set_domain(&result, self.ys[alpha], new_dy);
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
    fn first_differing_position_is_bounded() {
        let mut m = Model::new(5);
        let x0 = m.int_var(1, 1, "x0").unwrap();
        let y0 = m.int_var(1, 1, "y0").unwrap();
        let x1 = m.int_var(1, 5, "x1").unwrap();
        let y1 = m.int_var(3, 3, "y1").unwrap();
        m.add_constraint(Arc::new(Lex::new(vec![x0, x1], vec![y0, y1], false).unwrap()));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, x1).max(), Some(3));
    }
}
