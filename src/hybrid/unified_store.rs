//! `UnifiedStore`: the relational and finite-domain halves of a single
//! search node, bridged by a map from relational variable id to FD
//! variable id (spec §4.5).
//!
//! Grounded on `store.rs`'s `LocalConstraintStore` (the relational
//! half, reused verbatim) and `fd::model::Model`/`fd::propagator::MaybeState`
//! (the FD half); both are already structurally-shared and cheap to
//! clone, so `UnifiedStore` itself needs no bespoke persistence layer.
use crate::cancel::CancellationToken;
use crate::fd::domain::Domain;
use crate::fd::model::{Model, VarId};
use crate::fd::propagator::MaybeState;
use crate::fd::state::{get_domain, set_domain};
use crate::store::LocalConstraintStore;
use std::rc::Rc;

/// One search node's complete state: relational bindings/constraints
/// plus FD domains, joined by `var_map`. Cloning is cheap (a few
/// refcount bumps and persistent-map clones).
#[derive(Debug, Clone)]
pub struct UnifiedStore {
    pub relational: LocalConstraintStore,
    pub fd_model: Rc<Model>,
    pub fd_state: MaybeState,
    /// Relational variable id -> FD variable id, for variables shared
    /// between the two worlds.
    pub var_map: im::HashMap<u64, VarId>,
    pub ctx: CancellationToken,
}

impl UnifiedStore {
    pub fn new(relational: LocalConstraintStore, fd_model: Rc<Model>, ctx: CancellationToken) -> UnifiedStore {
        UnifiedStore {
            relational,
            fd_model,
            fd_state: None,
            var_map: im::HashMap::new(),
            ctx,
        }
    }

    /// Register a relational variable as standing for the given FD
    /// variable, so plugins know to keep the two sides in sync.
    pub fn link(&self, rvar: u64, fvar: VarId) -> UnifiedStore {
        UnifiedStore {
            var_map: self.var_map.update(rvar, fvar),
            ..self.clone()
        }
    }

    pub fn get_domain(&self, fvar: VarId) -> Domain {
        get_domain(&self.fd_state, &self.fd_model, fvar)
    }

    pub fn set_domain(&self, fvar: VarId, domain: Domain) -> UnifiedStore {
        UnifiedStore {
            fd_state: set_domain(&self.fd_state, fvar, domain),
            ..self.clone()
        }
    }

    pub fn get_binding(&self, rvar: u64) -> Option<crate::term::Term> {
        self.relational.bindings.get(&rvar).cloned()
    }

    pub fn add_binding(&self, rvar: u64, term: crate::term::Term) -> UnifiedStore {
        UnifiedStore {
            relational: self.relational.with_bindings(self.relational.bindings.update(rvar, term)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::store::fresh_store;
    use crate::term::atom;

    #[test]
    fn link_then_set_domain_is_visible_through_the_map() {
        let mut m = Model::new(5);
        let v = m.int_var(1, 5, "v").unwrap();
        let store = UnifiedStore::new(fresh_store(), Rc::new(m), CancellationToken::new());
        let store = store.link(0, v);
        let store = store.set_domain(v, Domain::singleton(3, 5));
        assert_eq!(store.get_domain(*store.var_map.get(&0).unwrap()).to_vec(), vec![3]);
    }

    #[test]
    fn add_binding_is_readable_back() {
        let m = Model::new(5);
        let store = UnifiedStore::new(fresh_store(), Rc::new(m), CancellationToken::new());
        let store = store.add_binding(7, atom(2i64));
        assert_eq!(store.get_binding(7), Some(atom(2i64)));
    }
}
