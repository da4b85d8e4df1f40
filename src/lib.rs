//! A hybrid miniKanren-style relational engine and finite-domain
//! constraint solver: unification over immutable terms, lazy
//! interleaved goal streams, an FD propagation engine, a coordinator
//! joining the two into one search, a parallel FD search, and
//! SLG-style tabling over relations.
//!
//! Grounded throughout on proto-vulcan's engine-agnostic core
//! (`term`/`subst`/`stream`/`goal`), generalized from its generic
//! `User`/`Engine` type parameters to the concrete types this crate
//! needs (see each module's doc comment and `DESIGN.md`).
pub mod cancel;
pub mod error;
pub mod fd;
pub mod goal;
pub mod hybrid;
pub mod logging;
pub mod parallel;
pub mod reify;
pub mod relation;
pub mod run;
pub mod store;
pub mod stream;
pub mod subst;
pub mod tabling;
pub mod term;

pub use cancel::CancellationToken;
pub use error::{Conflict, Error, ModelError, Result};
pub use goal::{conda, conde, condu, conj, disj, eq, fresh_goal, fresh_goal_n, once, CondClause, Goal};
pub use relation::{absento, booleano, membero, neq, numbero, project, stringo, symbolo};
pub use run::{run, run_cancellable};
pub use store::{fresh_store, Constraint, GlobalConstraintBus, LocalConstraintStore};
pub use term::{atom, fresh, list, pair, symbol, var, Atom, Term, Var};

pub use fd::domain::Domain;
pub use fd::model::{FDVariable, Model, VarId};
pub use fd::propagator::{MaybeState, Propagator};
pub use fd::solver::{Assignment, Labeling, SearchKind, Solver, StrategyRegistry};

pub use hybrid::plugin::{FDPlugin, HybridOutcome, HybridSolver, Plugin, RelationalPlugin};
pub use hybrid::unified_store::UnifiedStore;

pub use logging::init as init_logging;
pub use parallel::solve_parallel;

pub use tabling::{tabled_not, CallKey, SubgoalState, TabledRelation};
