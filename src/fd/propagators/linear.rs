//! `LinearSum(vars, coeffs, total)`: `Σ cᵢ·vᵢ = total` under bounds
//! consistency (spec §4.4). `total` is itself a domain variable so the
//! constraint can tighten both the sum and each addend.
use crate::error::{ModelError, Result as CResult};
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::{MaybeState, Propagator};
use crate::fd::state::{get_domain, set_domain};
use crate::error::Conflict;

fn div_floor(a: i64, b: i64) -> i64 {
    let d = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        d - 1
    } else {
        d
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    -div_floor(-a, b)
}

fn clamp_range(lo: i64, hi: i64, universe: u32) -> Domain {
    let lo = lo.max(1);
    let hi = hi.min(universe as i64);
    if lo > hi {
        Domain::empty(universe)
    } else {
        Domain::from_range(lo as u32, hi as u32, universe)
    }
}

#[derive(Debug)]
pub struct LinearSum {
    vars: Vec<VarId>,
    coeffs: Vec<i64>,
    total: VarId,
}

impl LinearSum {
    pub fn new(vars: Vec<VarId>, coeffs: Vec<i64>, total: VarId) -> CResult<LinearSum> {
        if vars.len() != coeffs.len() {
            return Err(ModelError::CoefficientLengthMismatch {
                vars: vars.len(),
                coeffs: coeffs.len(),
            }
            .into());
        }
        Ok(LinearSum { vars, coeffs, total })
    }
}

impl Propagator for LinearSum {
    fn variables(&self) -> Vec<VarId> {
        let mut vs = self.vars.clone();
        vs.push(self.total);
        vs
    }

    fn propagate(&self, model: &Model, state: &MaybeState) -> Result<(MaybeState, bool), Conflict> {
        let domains: Vec<Domain> = self.vars.iter().map(|v| get_domain(state, model, *v)).collect();
        let dt = get_domain(state, model, self.total);

        let contrib_min: Vec<i64> = domains
            .iter()
            .zip(&self.coeffs)
            .map(|(d, c)| if *c >= 0 { *c * d.min().unwrap() as i64 } else { *c * d.max().unwrap() as i64 })
            .collect();
        let contrib_max: Vec<i64> = domains
            .iter()
            .zip(&self.coeffs)
            .map(|(d, c)| if *c >= 0 { *c * d.max().unwrap() as i64 } else { *c * d.min().unwrap() as i64 })
            .collect();
        let sum_min: i64 = contrib_min.iter().sum();
        let sum_max: i64 = contrib_max.iter().sum();

        let new_total = dt.intersect(&clamp_range(sum_min, sum_max, dt.universe()));
        if new_total.is_empty() {
            return Err(Conflict::on_var(self.total, "linear sum bound excludes total's domain"));
        }
        let t_min = new_total.min().unwrap() as i64;
        let t_max = new_total.max().unwrap() as i64;

        let mut changed = new_total != dt;
        let mut result = state.clone();
        if changed {
            result = set_domain(&result, self.total, new_total);
        }

        for (i, (d, ci)) in domains.iter().zip(&self.coeffs).enumerate() {
            if *ci == 0 {
                continue;
            }
            let contrib_lo = t_min - (sum_max - contrib_max[i]);
            let contrib_hi = t_max - (sum_min - contrib_min[i]);
            let (vmin, vmax) = if *ci > 0 {
                (div_ceil(contrib_lo, *ci), div_floor(contrib_hi, *ci))
            } else {
                (div_ceil(contrib_hi, *ci), div_floor(contrib_lo, *ci))
            };
            let new_d = d.intersect(&clamp_range(vmin, vmax, d.universe()));
            if new_d.is_empty() {
                return Err(Conflict::on_var(self.vars[i], "linear sum bound emptied addend domain"));
            }
            if new_d != *d {
                changed = true;
                result = set_domain(&result, self.vars[i], new_d);
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
    fn sum_of_two_vars_bounds_both() {
        let mut m = Model::new(20);
        let a = m.int_var(1, 5, "a").unwrap();
        let b = m.int_var(1, 5, "b").unwrap();
        let t = m.int_var(1, 20, "t").unwrap();
        m.add_constraint(Arc::new(LinearSum::new(vec![a, b], vec![1, 1], t).unwrap()));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, t).to_vec(), (2..=10).collect::<Vec<_>>());
    }

    #[test]
    fn fixing_total_bounds_addends() {
        let mut m = Model::new(20);
        let a = m.int_var(1, 10, "a").unwrap();
        let b = m.int_var(1, 10, "b").unwrap();
        let t = m.int_var(15, 15, "t").unwrap();
        m.add_constraint(Arc::new(LinearSum::new(vec![a, b], vec![1, 1], t).unwrap()));
        let ctx = CancellationToken::new();
        let state = fixed_point(&m, None, &ctx).unwrap();
        assert_eq!(get_domain(&state, &m, a).min(), Some(5));
        assert_eq!(get_domain(&state, &m, b).min(), Some(5));
    }
}
