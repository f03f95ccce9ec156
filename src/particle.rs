// Particle definitions consumed by the tables and the time integrators.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use crate::constants::{ELECTRON_MASS, MUON_MASS, TAU_MASS};

/// Static definition of a particle species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleDef {
    pub name: String,
    /// Rest mass in MeV.
    pub mass: f64,
    /// Electric charge in units of e.
    pub charge: f64,
}

impl ParticleDef {
    pub fn new(name: impl Into<String>, mass: f64, charge: f64) -> Result<Self, String> {
        let name = name.into();
        if mass < 0.0 {
            return Err(format!("particle '{}' has negative mass {}", name, mass));
        }
        Ok(ParticleDef { name, mass, charge })
    }

    pub fn muon() -> Self {
        ParticleDef::new("mu-", MUON_MASS, -1.0).expect("preset particle is valid")
    }

    pub fn tau() -> Self {
        ParticleDef::new("tau-", TAU_MASS, -1.0).expect("preset particle is valid")
    }

    pub fn electron() -> Self {
        ParticleDef::new("e-", ELECTRON_MASS, -1.0).expect("preset particle is valid")
    }

    /// Massless reference particle; always travels at the speed of light.
    pub fn photon() -> Self {
        ParticleDef::new("gamma", 0.0, 0.0).expect("preset particle is valid")
    }

    /// Identity hash over the defining fields.
    pub fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(self.name.as_bytes());
        hasher.write_u64(self.mass.to_bits());
        hasher.write_u64(self.charge.to_bits());
        hasher.finish()
    }
}
