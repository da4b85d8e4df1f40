//! SLG-style tabling: memoized relations over the single-threaded
//! relational evaluator (spec §4.7).
pub mod pattern;
pub mod table;
pub mod tabled;

pub use pattern::CallKey;
pub use table::{invalidate, invalidate_all, scc_containing, SubgoalState};
pub use tabled::{tabled_not, TabledRelation};
