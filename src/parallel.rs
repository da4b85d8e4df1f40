//! Parallel finite-domain search: a shared MPMC work queue drained by
//! OS-thread workers, a task counter for termination, and a bounded
//! solution channel watched by the coordinator (spec §4.6, §5).
//!
//! Grounded on `fd::solver`'s sequential `dfs`/`fixed_point` (the same
//! propagate/choose/expand step is reused here so the two searches stay
//! equivalent) and on `crossbeam_channel`'s `Sender`/`Receiver`, used the
//! way `plaans-aries`' solver threads its progress channel through a
//! `crossbeam_channel::Sender` (see `other_examples/`).
use crate::cancel::CancellationToken;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::MaybeState;
use crate::fd::solver::{choose_var, extract_assignment, fixed_point, is_complete, order_values, Assignment, Labeling};
use crate::fd::state::{get_domain, StatePool};
use crossbeam_channel::{bounded, Sender, TryRecvError, TrySendError};
use crossbeam_utils::sync::WaitGroup;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{instrument, trace};

const WORK_QUEUE_CAPACITY: usize = 4096;
const SOLUTION_QUEUE_CAPACITY: usize = 1024;

struct WorkItem {
    state: MaybeState,
}

/// Propagate one search node to a fixed point and dispatch: a conflict
/// or a complete assignment terminates this branch; otherwise each
/// child of the chosen branch is either handed to the shared queue or,
/// if it is full, expanded inline by the current worker (spec §5's
/// deadlock-avoidance rule: never block a producer that is itself a
/// consumer).
#[allow(clippy::too_many_arguments)]
fn process_node(
    model: &Model,
    pool: &StatePool,
    state: MaybeState,
    work_tx: &Sender<WorkItem>,
    pending: &AtomicUsize,
    sol_tx: &Sender<Assignment>,
    ctx: &CancellationToken,
    labeling: Labeling,
    rng: &mut StdRng,
) {
    if ctx.is_cancelled() {
        pending.fetch_sub(1, Ordering::SeqCst);
        return;
    }
    let propagated = match fixed_point(model, state, ctx) {
        Ok(s) => s,
        Err(_) => {
            pending.fetch_sub(1, Ordering::SeqCst);
            return;
        }
    };
    if is_complete(model, &propagated) {
        let _ = sol_tx.try_send(extract_assignment(model, &propagated));
        pending.fetch_sub(1, Ordering::SeqCst);
        return;
    }

    let unassigned: Vec<VarId> = model
        .variables()
        .iter()
        .filter(|v| !get_domain(&propagated, model, v.id).is_singleton())
        .map(|v| v.id)
        .collect();
    let var = choose_var(model, &propagated, &unassigned, labeling, rng);
    let domain = get_domain(&propagated, model, var);
    let universe = domain.universe();
    for v in order_values(&domain, labeling, rng) {
        let child = pool.alloc(&propagated, var, Domain::singleton(v, universe));
        pending.fetch_add(1, Ordering::SeqCst);
        match work_tx.try_send(WorkItem { state: child }) {
            Ok(()) => {}
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => {
                process_node(model, pool, item.state, work_tx, pending, sol_tx, ctx, labeling, rng);
            }
        }
    }
    pending.fetch_sub(1, Ordering::SeqCst);
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    model: &Model,
    pool: &StatePool,
    work_tx: Sender<WorkItem>,
    work_rx: crossbeam_channel::Receiver<WorkItem>,
    sol_tx: Sender<Assignment>,
    pending: Arc<AtomicUsize>,
    ctx: &CancellationToken,
    labeling: Labeling,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    loop {
        if ctx.is_cancelled() {
            // Drain whatever is already queued so the task counter still
            // reaches zero, instead of just dropping out and leaving other
            // workers to spin on a count that never completes (spec §5).
            while work_rx.try_recv().is_ok() {
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            return;
        }
        match work_rx.try_recv() {
            Ok(item) => process_node(model, pool, item.state, &work_tx, &pending, &sol_tx, ctx, labeling, &mut rng),
            Err(TryRecvError::Empty) => {
                if pending.load(Ordering::SeqCst) == 0 {
                    return;
                }
                thread::yield_now();
            }
            Err(TryRecvError::Disconnected) => return,
        }
    }
}

/// Enumerate up to `max_solutions` solutions (`0` means all) of `model`
/// using `workers` OS threads. Per spec §8 property 4, the returned
/// **multiset** equals `Solver::solve`'s for enumerate-all queries;
/// arrival order across workers is not guaranteed.
#[instrument(level = "debug", skip(model, ctx))]
pub fn solve_parallel(model: &Model, ctx: &CancellationToken, workers: usize, labeling: Labeling, max_solutions: usize) -> Vec<Assignment> {
    let pool = StatePool::new();
    let root = match fixed_point(model, None, ctx) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    if is_complete(model, &root) {
        return vec![extract_assignment(model, &root)];
    }

    let (work_tx, work_rx) = bounded::<WorkItem>(WORK_QUEUE_CAPACITY);
    let (sol_tx, sol_rx) = bounded::<Assignment>(SOLUTION_QUEUE_CAPACITY);
    let pending = Arc::new(AtomicUsize::new(1));
    work_tx.send(WorkItem { state: root }).expect("queue was just created");

    let worker_count = workers.max(1);
    let wg = WaitGroup::new();
    let mut out = Vec::new();

    thread::scope(|scope| {
        for i in 0..worker_count {
            let work_tx = work_tx.clone();
            let work_rx = work_rx.clone();
            let sol_tx = sol_tx.clone();
            let pending = Arc::clone(&pending);
            let pool = &pool;
            let ctx = ctx.clone();
            let wg = wg.clone();
            scope.spawn(move || {
                worker_loop(model, pool, work_tx, work_rx, sol_tx, pending, &ctx, labeling, i as u64);
                drop(wg);
            });
        }
        drop(work_tx);
        drop(sol_tx);

        for assignment in sol_rx.iter() {
            out.push(assignment);
            if max_solutions != 0 && out.len() >= max_solutions {
                ctx.cancel();
                break;
            }
        }
        wg.wait();
    });

    trace!(solutions = out.len(), workers = worker_count, "parallel search finished");
    out
}
