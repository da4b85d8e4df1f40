//! Plugins that narrow a `UnifiedStore` and the `HybridSolver` that
//! alternates them to a fixed point (spec §4.5).
//!
//! Grounded on the `Propagator` trait (`fd/propagator.rs`): a plugin is
//! the same shape one level up — it consumes a store and returns a
//! narrowed store plus a changed flag, `Conflict` on unsatisfiability.
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::solver::fixed_point;
use crate::hybrid::unified_store::UnifiedStore;
use crate::term::{Atom, Term};
use tracing::{instrument, trace};

/// A component of the hybrid fixed-point loop. `propagate` takes a
/// store by value and returns a (possibly identical) successor store
/// plus whether anything changed, matching the `Propagator` contract.
pub trait Plugin: std::fmt::Debug {
    fn name(&self) -> &str;
    fn propagate(&self, store: UnifiedStore) -> Result<(UnifiedStore, bool), Conflict>;
}

/// Narrow one FD domain to `{value}` given a relational binding to a
/// numeric atom; fails if the value is outside the domain's universe
/// or the intersection empties it.
fn narrow_from_binding(store: &UnifiedStore, rvar: u64) -> Result<Option<UnifiedStore>, Conflict> {
    let fvar = match store.var_map.get(&rvar) {
        Some(f) => *f,
        None => return Ok(None),
    };
    let bound = match store.get_binding(rvar) {
        Some(Term::Atom(Atom::Int(n))) => n,
        _ => return Ok(None),
    };
    let d = store.get_domain(fvar);
    if bound < 1 || bound as u32 > d.universe() {
        return Err(Conflict::on_var(fvar, "relational binding is outside the variable's finite-domain universe"));
    }
    let singleton = Domain::singleton(bound as u32, d.universe());
    let narrowed = d.intersect(&singleton);
    if narrowed.is_empty() {
        return Err(Conflict::on_var(fvar, "relational binding excludes every remaining finite-domain value"));
    }
    if narrowed == d {
        return Ok(None);
    }
    Ok(Some(store.set_domain(fvar, narrowed)))
}

/// Push every singleton FD domain in `var_map` back out as a
/// relational binding (singleton promotion).
fn promote_singletons(mut store: UnifiedStore) -> (UnifiedStore, bool) {
    let mut changed = false;
    let pairs: Vec<(u64, u32)> = store.var_map.iter().map(|(r, f)| (*r, *f)).collect();
    for (rvar, fvar) in pairs {
        if let Some(v) = store.get_domain(fvar).singleton_value() {
            let atom = Term::Atom(Atom::Int(v as i64));
            if store.get_binding(rvar).as_ref() != Some(&atom) {
                store = store.add_binding(rvar, atom);
                changed = true;
            }
        }
    }
    (store, changed)
}

/// Reads relational bindings into FD domains, re-checks every pending
/// relational constraint, and promotes any resulting FD singleton back
/// into a binding.
#[derive(Debug, Default)]
pub struct RelationalPlugin;

impl Plugin for RelationalPlugin {
    fn name(&self) -> &str {
        "relational"
    }

    fn propagate(&self, mut store: UnifiedStore) -> Result<(UnifiedStore, bool), Conflict> {
        let mut changed = false;
        let rvars: Vec<u64> = store.var_map.keys().cloned().collect();
        for rvar in rvars {
            if let Some(next) = narrow_from_binding(&store, rvar)? {
                store = next;
                changed = true;
            }
        }

        let touched: Vec<u64> = store.relational.bindings.keys().cloned().collect();
        let relational = store
            .relational
            .recheck_constraints(&touched)
            .ok_or_else(|| Conflict::new("relational plugin: a constraint was violated"))?;
        store = UnifiedStore { relational, ..store };

        let (store, promoted) = promote_singletons(store);
        Ok((store, changed || promoted))
    }
}

/// Wraps the FD fixed-point loop: reads relational bindings into
/// domains, runs propagation to a fixed point, writes the result back,
/// and promotes any singleton domain to a relational binding.
#[derive(Debug, Default)]
pub struct FDPlugin;

impl Plugin for FDPlugin {
    fn name(&self) -> &str {
        "fd"
    }

    fn propagate(&self, mut store: UnifiedStore) -> Result<(UnifiedStore, bool), Conflict> {
        let mut changed = false;
        let rvars: Vec<u64> = store.var_map.keys().cloned().collect();
        for rvar in rvars {
            if let Some(next) = narrow_from_binding(&store, rvar)? {
                store = next;
                changed = true;
            }
        }

        let before = store.fd_state.clone();
        let fd_state = fixed_point(&store.fd_model, before.clone(), &store.ctx)?;
        let fd_changed = !domains_equal(&store, &before, &fd_state);
        store = UnifiedStore { fd_state, ..store };

        let (store, promoted) = promote_singletons(store);
        Ok((store, changed || fd_changed || promoted))
    }
}

fn domains_equal(store: &UnifiedStore, a: &crate::fd::propagator::MaybeState, b: &crate::fd::propagator::MaybeState) -> bool {
    store
        .fd_model
        .variables()
        .iter()
        .all(|v| crate::fd::state::get_domain(a, &store.fd_model, v.id) == crate::fd::state::get_domain(b, &store.fd_model, v.id))
}

/// What stopped the hybrid loop short of returning a narrowed store.
/// Kept distinct from `Conflict` so a caller can tell genuine
/// unsatisfiability (backtrack, per spec §7) from non-termination
/// (surface as `Error::Resource`, per spec §6/§7) without conflating
/// the two — see DESIGN.md.
#[derive(Debug)]
pub enum HybridOutcome {
    Conflict(Conflict),
    Diverged { iterations: usize },
}

impl From<Conflict> for HybridOutcome {
    fn from(c: Conflict) -> HybridOutcome {
        HybridOutcome::Conflict(c)
    }
}

/// Alternates a list of plugins over a `UnifiedStore` until none of
/// them report a change, or an iteration bound is hit.
#[derive(Debug)]
pub struct HybridSolver {
    plugins: Vec<Box<dyn Plugin>>,
    max_iterations: usize,
}

impl HybridSolver {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> HybridSolver {
        HybridSolver { plugins, max_iterations: 100 }
    }

    pub fn with_default_plugins() -> HybridSolver {
        HybridSolver::new(vec![Box::new(RelationalPlugin), Box::new(FDPlugin)])
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> HybridSolver {
        self.max_iterations = max_iterations;
        self
    }

    /// Run every plugin once, in order.
    pub fn propagate(&self, mut store: UnifiedStore) -> Result<(UnifiedStore, bool), Conflict> {
        let mut changed = false;
        for plugin in &self.plugins {
            let (next, did_change) = plugin.propagate(store)?;
            store = next;
            changed = changed || did_change;
        }
        Ok((store, changed))
    }

    /// Alternate all plugins until a fixed point is reached.
    #[instrument(level = "debug", skip(self, store))]
    pub fn run_to_fixed_point(&self, mut store: UnifiedStore) -> Result<UnifiedStore, HybridOutcome> {
        for iteration in 0..self.max_iterations {
            if store.ctx.is_cancelled() {
                return Ok(store);
            }
            let (next, changed) = self.propagate(store)?;
            store = next;
            if !changed {
                trace!(iteration, "hybrid loop reached a fixed point");
                return Ok(store);
            }
        }
        trace!(iterations = self.max_iterations, "hybrid loop exhausted its iteration bound");
        Err(HybridOutcome::Diverged { iterations: self.max_iterations })
    }
}
