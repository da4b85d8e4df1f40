//! The immutable FD model: a catalog of variables and propagation
//! constraints, fixed once construction succeeds (spec §3).
use crate::error::{Error, ModelError, Result};
use crate::fd::domain::Domain;
use crate::fd::propagator::Propagator;
use std::sync::Arc;

pub type VarId = u32;

#[derive(Debug, Clone)]
pub struct FDVariable {
    pub id: VarId,
    pub name: Arc<str>,
    pub initial_domain: Domain,
}

#[derive(Debug, Default)]
pub struct Model {
    variables: Vec<FDVariable>,
    constraints: Vec<Arc<dyn Propagator>>,
    universe: u32,
}

impl Model {
    pub fn new(universe: u32) -> Model {
        Model {
            variables: Vec::new(),
            constraints: Vec::new(),
            universe,
        }
    }

    pub fn universe(&self) -> u32 {
        self.universe
    }

    /// Declare a variable ranging over `[min, max]`. Returns a
    /// validation error if the resulting domain is empty.
    pub fn int_var(&mut self, min: u32, max: u32, name: impl Into<Arc<str>>) -> Result<VarId> {
        let id = self.variables.len() as VarId;
        let domain = Domain::from_range(min, max, self.universe);
        if domain.is_empty() {
            return Err(Error::from(ModelError::EmptyDomain { var: id }));
        }
        self.variables.push(FDVariable {
            id,
            name: name.into(),
            initial_domain: domain,
        });
        Ok(id)
    }

    /// Declare a variable ranging over an explicit value set.
    pub fn int_var_values(
        &mut self,
        values: impl IntoIterator<Item = u32>,
        name: impl Into<Arc<str>>,
    ) -> Result<VarId> {
        let id = self.variables.len() as VarId;
        let domain = Domain::from_values(values, self.universe);
        if domain.is_empty() {
            return Err(Error::from(ModelError::EmptyDomain { var: id }));
        }
        self.variables.push(FDVariable {
            id,
            name: name.into(),
            initial_domain: domain,
        });
        Ok(id)
    }

    pub fn add_constraint(&mut self, c: Arc<dyn Propagator>) {
        self.constraints.push(c);
    }

    pub fn variable(&self, id: VarId) -> &FDVariable {
        &self.variables[id as usize]
    }

    pub fn variables(&self) -> &[FDVariable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Arc<dyn Propagator>] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }
}
