//! The finite-domain constraint solver (spec §3–§4.3–§4.4).
pub mod domain;
pub mod model;
pub mod propagator;
pub mod propagators;
pub mod solver;
pub mod state;
