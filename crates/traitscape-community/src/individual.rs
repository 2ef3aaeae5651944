//! Individual-level trait measurements
//!
//! The finest-grained data: one record per measured organism with its plot,
//! species and raw trait values. Missing measurements are `None`.

use serde::{Deserialize, Serialize};

use crate::{CommunityError, Result};

/// A single measured organism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub plot: String,
    pub species: String,
    /// One value per trait of the owning [`IndividualTable`].
    pub traits: Vec<Option<f64>>,
}

/// Individuals sharing one list of trait names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualTable {
    trait_names: Vec<String>,
    individuals: Vec<Individual>,
}

impl IndividualTable {
    #[must_use]
    pub fn new(trait_names: Vec<String>) -> Self {
        Self {
            trait_names,
            individuals: vec![],
        }
    }

    /// Adds an individual; its trait vector must match the trait names.
    pub fn push(&mut self, individual: Individual) -> Result<()> {
        if individual.traits.len() != self.trait_names.len() {
            return Err(CommunityError::DimensionMismatch {
                what: "individual trait values",
                expected: self.trait_names.len(),
                found: individual.traits.len(),
            });
        }
        self.individuals.push(individual);
        Ok(())
    }

    #[must_use]
    pub fn trait_names(&self) -> &[String] {
        &self.trait_names
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    #[must_use]
    pub fn trait_index(&self, name: &str) -> Option<usize> {
        self.trait_names.iter().position(|n| n == name)
    }
}
