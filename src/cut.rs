// Energy cut settings: the boundary between continuous and stochastic
// energy loss.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use crate::parametrization::KinematicLimits;

/// Upper bound on the transfer fraction treated as continuous loss.
///
/// Losses with `v` below the cut are absorbed into dE/dx; losses above it
/// are sampled as discrete interactions. The cut can be given as an
/// absolute energy (`e_cut`, MeV), a relative fraction (`v_cut`), or both;
/// the tighter of the two applies at any given energy. Use
/// `f64::INFINITY` for `e_cut` to disable the absolute bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCutSettings {
    e_cut: f64,
    v_cut: f64,
}

impl EnergyCutSettings {
    pub fn new(e_cut: f64, v_cut: f64) -> Result<Self, String> {
        if !(e_cut > 0.0) {
            return Err(format!("e_cut must be positive, got {}", e_cut));
        }
        if !(v_cut > 0.0 && v_cut <= 1.0) {
            return Err(format!("v_cut must lie in (0, 1], got {}", v_cut));
        }
        Ok(EnergyCutSettings { e_cut, v_cut })
    }

    pub fn e_cut(&self) -> f64 {
        self.e_cut
    }

    pub fn v_cut(&self) -> f64 {
        self.v_cut
    }

    /// Effective cut at the given energy, clamped into the kinematically
    /// allowed window.
    pub fn get_cut(&self, limits: &KinematicLimits, energy: f64) -> f64 {
        (self.e_cut / energy)
            .min(self.v_cut)
            .max(limits.v_min)
            .min(limits.v_max)
    }

    /// Identity hash over the defining fields.
    pub fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_u64(self.e_cut.to_bits());
        hasher.write_u64(self.v_cut.to_bits());
        hasher.finish()
    }
}
