//! Fixed-point propagation, labeling, and search (spec §4.3).
//!
//! Grounded on `plico::solver::strategy::BacktrackingSearch` for the
//! overall shape (pluggable strategy driving a generic solve loop) and
//! on spec §4.3's literal fixed-point pseudocode.
use crate::cancel::CancellationToken;
use crate::error::Conflict;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::MaybeState;
use crate::fd::state::{get_domain, StatePool};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::{instrument, trace};

pub type Assignment = HashMap<VarId, u32>;

/// Labeling (variable-choice) strategies, each with a stable registry id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Labeling {
    FirstFail,
    DomainSizeIncreasing,
    Degree,
    Lex,
    Random,
}

impl Labeling {
    pub fn id(&self) -> &'static str {
        match self {
            Labeling::FirstFail => "first-fail",
            Labeling::DomainSizeIncreasing => "domain-size-increasing",
            Labeling::Degree => "degree",
            Labeling::Lex => "lex",
            Labeling::Random => "random",
        }
    }

    pub fn from_id(id: &str) -> Option<Labeling> {
        match id {
            "first-fail" => Some(Labeling::FirstFail),
            "domain-size-increasing" => Some(Labeling::DomainSizeIncreasing),
            "degree" => Some(Labeling::Degree),
            "lex" => Some(Labeling::Lex),
            "random" => Some(Labeling::Random),
            _ => None,
        }
    }
}

/// Search strategies, each with a stable registry id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Dfs,
    Bfs,
    LimitedDepth(u32),
    IterativeDeepening,
}

impl SearchKind {
    pub fn id(&self) -> String {
        match self {
            SearchKind::Dfs => "dfs".to_string(),
            SearchKind::Bfs => "bfs".to_string(),
            SearchKind::LimitedDepth(d) => format!("limited-depth:{d}"),
            SearchKind::IterativeDeepening => "iterative-deepening".to_string(),
        }
    }
}

/// A pluggable registry of labeling/search strategies keyed by their
/// stable string id (spec §4.3: "Strategies are pluggable through a
/// registry").
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    labelings: HashMap<String, Labeling>,
    searches: HashMap<String, SearchKind>,
}

impl StrategyRegistry {
    pub fn with_defaults() -> StrategyRegistry {
        let mut r = StrategyRegistry::default();
        for l in [
            Labeling::FirstFail,
            Labeling::DomainSizeIncreasing,
            Labeling::Degree,
            Labeling::Lex,
            Labeling::Random,
        ] {
            r.register_labeling(l);
        }
        for s in [SearchKind::Dfs, SearchKind::Bfs, SearchKind::IterativeDeepening] {
            r.register_search(s);
        }
        r
    }

    pub fn register_labeling(&mut self, l: Labeling) {
        self.labelings.insert(l.id().to_string(), l);
    }

    pub fn register_search(&mut self, s: SearchKind) {
        self.searches.insert(s.id(), s);
    }

    pub fn labeling(&self, id: &str) -> Option<Labeling> {
        self.labelings.get(id).copied()
    }

    pub fn search(&self, id: &str) -> Option<SearchKind> {
        self.searches.get(id).copied()
    }
}

/// Run every propagator in deterministic order until no propagator
/// reports a change; `Conflict` if any variable's domain is emptied.
#[instrument(level = "trace", skip(model, state, ctx))]
pub fn fixed_point(model: &Model, state: MaybeState, ctx: &CancellationToken) -> Result<MaybeState, Conflict> {
    let mut state = state;
    loop {
        if ctx.is_cancelled() {
            return Ok(state);
        }
        let mut changed_any = false;
        for p in model.constraints() {
            let (new_state, changed) = p.propagate(model, &state)?;
            state = new_state;
            changed_any = changed_any || changed;
            for v in model.variables() {
                if get_domain(&state, model, v.id).is_empty() {
                    trace!(var = v.id, "propagation emptied domain");
                    return Err(Conflict::on_var(v.id, "empty domain after propagation"));
                }
            }
        }
        if !changed_any {
            return Ok(state);
        }
    }
}

pub(crate) fn is_complete(model: &Model, state: &MaybeState) -> bool {
    model
        .variables()
        .iter()
        .all(|v| get_domain(state, model, v.id).is_singleton())
}

pub(crate) fn extract_assignment(model: &Model, state: &MaybeState) -> Assignment {
    model
        .variables()
        .iter()
        .map(|v| (v.id, get_domain(state, model, v.id).singleton_value().unwrap()))
        .collect()
}

pub(crate) fn choose_var(model: &Model, state: &MaybeState, unassigned: &[VarId], labeling: Labeling, rng: &mut StdRng) -> VarId {
    match labeling {
        Labeling::FirstFail => *unassigned
            .iter()
            .min_by_key(|v| get_domain(state, model, **v).count())
            .unwrap(),
        Labeling::DomainSizeIncreasing => *unassigned
            .iter()
            .min_by_key(|v| get_domain(state, model, **v).count())
            .unwrap(),
        Labeling::Degree => *unassigned
            .iter()
            .max_by_key(|v| model.constraints().iter().filter(|c| c.variables().contains(v)).count())
            .unwrap(),
        Labeling::Lex => *unassigned.iter().min().unwrap(),
        Labeling::Random => *unassigned.choose(rng).unwrap(),
    }
}

pub(crate) fn order_values(domain: &Domain, labeling: Labeling, rng: &mut StdRng) -> Vec<u32> {
    let mut values = domain.to_vec();
    if labeling == Labeling::Random {
        values.shuffle(rng);
    }
    values
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    model: &Model,
    pool: &StatePool,
    state: MaybeState,
    labeling: Labeling,
    ctx: &CancellationToken,
    max_solutions: usize,
    out: &mut Vec<Assignment>,
    depth_limit: Option<u32>,
    depth: u32,
    rng: &mut StdRng,
) {
    if ctx.is_cancelled() {
        return;
    }
    if max_solutions != 0 && out.len() >= max_solutions {
        return;
    }
    if is_complete(model, &state) {
        out.push(extract_assignment(model, &state));
        return;
    }
    if let Some(limit) = depth_limit {
        if depth >= limit {
            return;
        }
    }
    let unassigned: Vec<VarId> = model
        .variables()
        .iter()
        .filter(|v| !get_domain(&state, model, v.id).is_singleton())
        .map(|v| v.id)
        .collect();
    let var = choose_var(model, &state, &unassigned, labeling, rng);
    let domain = get_domain(&state, model, var);
    let universe = domain.universe();
    for v in order_values(&domain, labeling, rng) {
        if ctx.is_cancelled() || (max_solutions != 0 && out.len() >= max_solutions) {
            return;
        }
        let child = pool.alloc(&state, var, Domain::singleton(v, universe));
        if let Ok(propagated) = fixed_point(model, child, ctx) {
            dfs(
                model,
                pool,
                propagated,
                labeling,
                ctx,
                max_solutions,
                out,
                depth_limit,
                depth + 1,
                rng,
            );
        }
    }
}

fn bfs(model: &Model, pool: &StatePool, root: MaybeState, labeling: Labeling, ctx: &CancellationToken, max_solutions: usize, out: &mut Vec<Assignment>, rng: &mut StdRng) {
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(root);
    while let Some(state) = queue.pop_front() {
        if ctx.is_cancelled() || (max_solutions != 0 && out.len() >= max_solutions) {
            return;
        }
        if is_complete(model, &state) {
            out.push(extract_assignment(model, &state));
            continue;
        }
        let unassigned: Vec<VarId> = model
            .variables()
            .iter()
            .filter(|v| !get_domain(&state, model, v.id).is_singleton())
            .map(|v| v.id)
            .collect();
        let var = choose_var(model, &state, &unassigned, labeling, rng);
        let domain = get_domain(&state, model, var);
        let universe = domain.universe();
        for v in order_values(&domain, labeling, rng) {
            let child = pool.alloc(&state, var, Domain::singleton(v, universe));
            if let Ok(propagated) = fixed_point(model, child, ctx) {
                queue.push_back(propagated);
            }
        }
    }
}

/// The finite-domain solver: fixed-point propagation at the root plus
/// labeling-driven backtracking search.
pub struct Solver<'a> {
    model: &'a Model,
    labeling: Labeling,
    search: SearchKind,
    pool: StatePool,
    seed: u64,
}

impl<'a> Solver<'a> {
    pub fn new(model: &'a Model) -> Solver<'a> {
        Solver {
            model,
            labeling: Labeling::FirstFail,
            search: SearchKind::Dfs,
            pool: StatePool::new(),
            seed: 0,
        }
    }

    pub fn with_labeling(mut self, labeling: Labeling) -> Self {
        self.labeling = labeling;
        self
    }

    pub fn with_search(mut self, search: SearchKind) -> Self {
        self.search = search;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn pool(&self) -> &StatePool {
        &self.pool
    }

    /// `max_solutions == 0` means enumerate all. Root propagation
    /// failure yields zero solutions, not an error (spec §4.3).
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn solve(&self, ctx: &CancellationToken, max_solutions: usize) -> Vec<Assignment> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let root = match fixed_point(self.model, None, ctx) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        let mut out = Vec::new();
        match self.search {
            SearchKind::Dfs => dfs(self.model, &self.pool, root, self.labeling, ctx, max_solutions, &mut out, None, 0, &mut rng),
            SearchKind::LimitedDepth(d) => dfs(
                self.model,
                &self.pool,
                root,
                self.labeling,
                ctx,
                max_solutions,
                &mut out,
                Some(d),
                0,
                &mut rng,
            ),
            SearchKind::Bfs => bfs(self.model, &self.pool, root, self.labeling, ctx, max_solutions, &mut out, &mut rng),
            SearchKind::IterativeDeepening => {
                let n = self.model.num_variables() as u32;
                for depth in 1..=n.max(1) {
                    out.clear();
                    dfs(
                        self.model,
                        &self.pool,
                        root.clone(),
                        self.labeling,
                        ctx,
                        max_solutions,
                        &mut out,
                        Some(depth),
                        0,
                        &mut rng,
                    );
                    if !out.is_empty() || ctx.is_cancelled() {
                        break;
                    }
                }
            }
        }
        out
    }

    /// Branch-and-bound optimization: each improving solution posts a
    /// strict bound on `objective`'s domain for the next root-restarted
    /// search (spec §4.3). The model stays read-only; the bound is
    /// layered onto the *state*, not the model.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn solve_optimal(&self, ctx: &CancellationToken, objective: VarId, minimize: bool) -> Option<(Assignment, u32)> {
        let universe = self.model.universe();
        let mut best: Option<(Assignment, u32)> = None;
        loop {
            if ctx.is_cancelled() {
                break;
            }
            let bound_domain = match &best {
                None => Domain::full(universe),
                Some((_, val)) => {
                    if minimize {
                        if *val <= 1 {
                            break;
                        }
                        Domain::from_range(1, val - 1, universe)
                    } else {
                        if *val >= universe {
                            break;
                        }
                        Domain::from_range(val + 1, universe, universe)
                    }
                }
            };
            let root = crate::fd::state::set_domain(&None, objective, bound_domain);
            let propagated = match fixed_point(self.model, root, ctx) {
                Ok(s) => s,
                Err(_) => break,
            };
            let mut out = Vec::new();
            let mut rng = StdRng::seed_from_u64(self.seed);
            dfs(self.model, &self.pool, propagated, self.labeling, ctx, 1, &mut out, None, 0, &mut rng);
            match out.into_iter().next() {
                Some(assignment) => {
                    let val = *assignment.get(&objective).unwrap();
                    best = Some((assignment, val));
                }
                None => break,
            }
        }
        best
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fd::propagators::all_different::AllDifferent;
    use std::sync::Arc;

    #[test]
    fn all_different_n3_has_6_solutions_first_ascending() {
        let mut m = Model::new(3);
        let a = m.int_var(1, 3, "a").unwrap();
        let b = m.int_var(1, 3, "b").unwrap();
        let c = m.int_var(1, 3, "c").unwrap();
        m.add_constraint(Arc::new(AllDifferent::new(vec![a, b, c])));
        let ctx = CancellationToken::new();
        let solver = Solver::new(&m);
        let solutions = solver.solve(&ctx, 0);
        assert_eq!(solutions.len(), 6);
        let first = &solutions[0];
        assert_eq!(first[&a], 1);
        assert_eq!(first[&b], 2);
        assert_eq!(first[&c], 3);
    }

    #[test]
    fn max_solutions_one_stops_early() {
        let mut m = Model::new(3);
        let a = m.int_var(1, 3, "a").unwrap();
        let b = m.int_var(1, 3, "b").unwrap();
        let c = m.int_var(1, 3, "c").unwrap();
        m.add_constraint(Arc::new(AllDifferent::new(vec![a, b, c])));
        let ctx = CancellationToken::new();
        let solver = Solver::new(&m);
        let solutions = solver.solve(&ctx, 1);
        assert_eq!(solutions.len(), 1);
    }
}
