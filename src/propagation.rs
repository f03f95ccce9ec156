// Propagation-side consumers of the deterministic table queries:
// grammage-to-energy (displacement) and grammage-to-time integrators.
//
// These only read `calculate_dedx` from already-built cross sections;
// they never touch the build or cache layer directly, except to build
// their own optional speed-up table through the same machinery.

use std::sync::Arc;

use crate::cache::{self, table_key};
use crate::constants::SPEED_OF_LIGHT;
use crate::crosssection::{CrossSection, InterpolationDef};
use crate::integral::{Integral, IntegrationMethod};
use crate::interpolant::{Axis, Interpolant1d, Interpolant1dDef};
use crate::particle::ParticleDef;

/// Solves the track integral: how much grammage a particle crosses while
/// slowing from one energy to another under its summed dE/dx.
pub struct Displacement {
    cross_sections: Vec<Arc<CrossSection>>,
    lower_energy_lim: f64,
}

impl Displacement {
    pub fn new(cross_sections: Vec<Arc<CrossSection>>) -> Result<Self, String> {
        if cross_sections.is_empty() {
            return Err(String::from(
                "displacement requires at least one cross section",
            ));
        }
        let lower_energy_lim = cross_sections
            .iter()
            .map(|cross| cross.lower_energy_lim())
            .fold(f64::MIN, f64::max);
        Ok(Displacement {
            cross_sections,
            lower_energy_lim,
        })
    }

    /// Summed average energy loss per grammage over all processes.
    pub fn dedx_total(&self, energy: f64) -> f64 {
        self.cross_sections
            .iter()
            .map(|cross| cross.calculate_dedx(energy))
            .sum()
    }

    /// Grammage crossed while slowing from `e_i` to `e_f` (MeV), in
    /// g/cm^2. Zero energy difference means zero grammage.
    pub fn solve_track_integral(&self, e_i: f64, e_f: f64) -> f64 {
        if e_i == e_f {
            return 0.0;
        }
        Integral::default().integrate(
            e_f,
            e_i,
            |energy| 1.0 / self.dedx_total(energy),
            IntegrationMethod::LogSubstitution,
        )
    }

    /// Build (through the global table cache) an interpolated version of
    /// the track integral for repeated queries.
    pub fn interpolated(&self, def: &InterpolationDef) -> Result<DisplacementInterpolant, String> {
        let mut hashes: Vec<u64> = self.cross_sections.iter().map(|cross| cross.hash()).collect();
        hashes.push(def.hash());
        let lower = self.lower_energy_lim;
        let table_def = Interpolant1dDef {
            axis: Axis {
                nodes: def.nodes_cross_section,
                min: lower,
                max: def.max_node_energy,
                log: true,
            },
            order: def.order,
            rational: false,
            log_values: false,
        };
        let table = cache::get_or_build_1d(table_key("displacement", &hashes), || {
            Interpolant1d::build(&table_def, |energy| self.solve_track_integral(energy, lower))
        })?;
        Ok(DisplacementInterpolant { table })
    }
}

/// Tabulated cumulative track integral; queries are differences of two
/// table evaluations instead of fresh quadratures.
pub struct DisplacementInterpolant {
    table: Arc<Interpolant1d>,
}

impl DisplacementInterpolant {
    pub fn solve_track_integral(&self, e_i: f64, e_f: f64) -> f64 {
        if e_i == e_f {
            return 0.0;
        }
        self.table.interpolate(e_i) - self.table.interpolate(e_f)
    }
}

/// Elapsed-time integrators over a propagation step.
pub trait Time {
    /// Time in ns elapsed while the particle slows from `e_i` to `e_f`
    /// (MeV) crossing `grammage` (g/cm^2) in a medium of the given mass
    /// density (g/cm^3). Which of the arguments are used depends on the
    /// builder.
    fn time_elapsed(&self, e_i: f64, e_f: f64, grammage: f64, mass_density: f64) -> f64;
}

/// Assumes the particle travels at the speed of light; only the crossed
/// grammage matters.
pub struct ApproximateTimeBuilder;

impl Time for ApproximateTimeBuilder {
    fn time_elapsed(&self, _e_i: f64, _e_f: f64, grammage: f64, mass_density: f64) -> f64 {
        grammage / (mass_density * SPEED_OF_LIGHT)
    }
}

/// Integrates the true velocity along the slow-down path. Energies must
/// lie above the particle rest mass.
pub struct ExactTimeBuilder {
    displacement: Displacement,
    mass: f64,
}

impl ExactTimeBuilder {
    pub fn new(
        cross_sections: Vec<Arc<CrossSection>>,
        particle: &ParticleDef,
    ) -> Result<Self, String> {
        Ok(ExactTimeBuilder {
            displacement: Displacement::new(cross_sections)?,
            mass: particle.mass,
        })
    }
}

impl Time for ExactTimeBuilder {
    fn time_elapsed(&self, e_i: f64, e_f: f64, _grammage: f64, mass_density: f64) -> f64 {
        if e_i == e_f {
            return 0.0;
        }
        let mass = self.mass;
        let integral = Integral::default().integrate(
            e_f,
            e_i,
            |energy| {
                let momentum = (energy * energy - mass * mass).sqrt();
                energy / (momentum * self.displacement.dedx_total(energy))
            },
            IntegrationMethod::LogSubstitution,
        );
        integral / (mass_density * SPEED_OF_LIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_time_zero_distance() {
        let time = ApproximateTimeBuilder;
        assert_eq!(time.time_elapsed(1e6, 1e6, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_approximate_time_grows_with_distance() {
        let time = ApproximateTimeBuilder;
        let mut previous = 0.0;
        for step in 1..20 {
            let grammage = 10f64.powf(step as f64 * 0.4);
            let elapsed = time.time_elapsed(0.0, 0.0, grammage, 1.0);
            assert!(elapsed > previous);
            previous = elapsed;
        }
    }
}
