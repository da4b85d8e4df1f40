//! Global constraint propagators (spec §4.4). Each type implements
//! [`crate::fd::propagator::Propagator`]; grouped the way
//! `plico::solver::constraints` groups its constraint kinds one file
//! per concern.
pub mod all_different;
pub mod arithmetic;
pub mod cardinality;
pub mod circuit;
pub mod cumulative;
pub mod element;
pub mod lex;
pub mod linear;
pub mod minmax;
pub mod nvalue;
pub mod packing;
pub mod reified;
pub mod regular;
pub mod scheduling;
pub mod sequence;
pub mod table;
