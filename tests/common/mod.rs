// Shared test fixtures: an ionization-like parametrization with an
// analytically known cumulative rate, plus builders for the standard
// muon-in-water configuration.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::Arc;

use eloss_mc::constants::MUON_MASS;
use eloss_mc::{
    Component, CrossSection, EnergyCutSettings, InterpolationDef, KinematicLimits, Medium,
    Parametrization, ParticleDef,
};

/// Differential rate ~ strength * Z_eff / v^2 inside a fixed kinematic
/// window. Steep like real ionization, simple enough to integrate by
/// hand when a test wants the exact answer.
pub struct TestIonization {
    pub strength: f64,
    pub multiplier: f64,
    pub v_min: f64,
    pub v_max: f64,
    pub lower_energy_lim: f64,
}

impl Default for TestIonization {
    fn default() -> Self {
        TestIonization {
            strength: 0.5,
            multiplier: 1.0,
            v_min: 1e-5,
            v_max: 0.1,
            lower_energy_lim: MUON_MASS,
        }
    }
}

impl Parametrization for TestIonization {
    fn name(&self) -> &str {
        "test_ionization"
    }

    fn kinematic_limits(&self, _energy: f64, _component: Option<&Component>) -> KinematicLimits {
        KinematicLimits {
            v_min: self.v_min,
            v_max: self.v_max,
        }
    }

    fn differential_rate(&self, _energy: f64, v: f64, component: Option<&Component>) -> f64 {
        let weight = component
            .map(|c| c.atoms_in_molecule * c.nuc_charge)
            .unwrap_or(10.0);
        self.strength * weight / (v * v)
    }

    fn lower_energy_lim(&self) -> f64 {
        self.lower_energy_lim
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(self.name().as_bytes());
        hasher.write_u64(self.strength.to_bits());
        hasher.write_u64(self.multiplier.to_bits());
        hasher.write_u64(self.v_min.to_bits());
        hasher.write_u64(self.v_max.to_bits());
        hasher.write_u64(self.lower_energy_lim.to_bits());
        hasher.finish()
    }
}

pub fn test_def() -> InterpolationDef {
    InterpolationDef {
        nodes_cross_section: 50,
        nodes_continuous_randomization: 50,
        max_node_energy: 1e10,
        order: 5,
    }
}

/// Muon in water with an absolute 10 GeV cut: at 1e6 MeV the effective
/// cut is v = 0.01 against a kinematic maximum of 0.1.
pub fn muon_water_cross(process: TestIonization) -> CrossSection {
    CrossSection::new(
        Arc::new(process),
        &ParticleDef::muon(),
        &Medium::water(),
        &EnergyCutSettings::new(1e4, 1.0).unwrap(),
        &test_def(),
    )
    .expect("test cross section builds")
}

/// Muon in water with the relative 5% cut used by the time integrator
/// tests.
pub fn muon_water_cross_relative_cut() -> CrossSection {
    CrossSection::new(
        Arc::new(TestIonization::default()),
        &ParticleDef::muon(),
        &Medium::water(),
        &EnergyCutSettings::new(f64::INFINITY, 0.05).unwrap(),
        &test_def(),
    )
    .expect("test cross section builds")
}
