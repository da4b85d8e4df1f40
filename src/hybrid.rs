//! The hybrid coordinator joining relational and finite-domain search
//! into one store (spec §4.5).
pub mod plugin;
pub mod unified_store;
