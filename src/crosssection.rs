// Cross section tables: interpolated dE/dx, dE^2/dx and dN/dx per medium
// component, plus inversion of the cumulative rate for stochastic
// sampling.
//
// A `CrossSection` is built once per (process, particle, medium, cut,
// grid configuration) tuple and is immutable afterwards; every query is
// read-only, so built tables can be shared freely between transport
// threads. The total interaction rate flows explicitly from
// `calculate_dndx` into `calculate_stochastic_loss` - there is no hidden
// "last rate" state and therefore no call-order dependency.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cache::{self, hash_combine, table_key};
use crate::cut::EnergyCutSettings;
use crate::integral::{Integral, IntegrationMethod};
use crate::interpolant::{Axis, Interpolant1d, Interpolant1dDef, Interpolant2d, Interpolant2dDef};
use crate::medium::{Component, Medium};
use crate::parametrization::Parametrization;
use crate::particle::ParticleDef;

/// Grid configuration shared by all tables of one cross section.
/// Immutable once used to build; part of the cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationDef {
    /// Nodes per axis of the dE/dx and dN/dx tables.
    pub nodes_cross_section: usize,
    /// Nodes of the dE^2/dx table used by continuous-loss fluctuation
    /// estimators.
    pub nodes_continuous_randomization: usize,
    /// Upper bound of the energy axis in MeV.
    pub max_node_energy: f64,
    /// Number of nodes per local interpolation fit.
    pub order: usize,
}

impl Default for InterpolationDef {
    fn default() -> Self {
        InterpolationDef {
            nodes_cross_section: 100,
            nodes_continuous_randomization: 200,
            max_node_energy: 1e12,
            order: 5,
        }
    }
}

impl InterpolationDef {
    /// Identity hash over the defining fields.
    pub fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_usize(self.nodes_cross_section);
        hasher.write_usize(self.nodes_continuous_randomization);
        hasher.write_u64(self.max_node_energy.to_bits());
        hasher.write_usize(self.order);
        hasher.finish()
    }
}

/// Target of a rate or a sampled loss: one medium component, or the bulk
/// medium for processes that do not resolve per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    Bulk,
    Component(usize),
}

/// Interaction rates per target, as returned by `calculate_dndx`.
pub type Rates = HashMap<ComponentId, f64>;

/// Outcome of sampling one discrete energy loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticLoss {
    pub component: ComponentId,
    /// Relative energy transfer fraction.
    pub v: f64,
    /// Absolute energy loss in MeV.
    pub loss: f64,
}

/// Map the table coordinate `v_bar` in [0, 1] to a physical transfer
/// fraction in `[v_cut, v_max]`.
///
/// The mapping is exponential so that the cumulative-rate axis stays
/// well conditioned no matter how narrow or wide the kinematic window
/// is: `v = v_cut * exp(v_bar * ln(v_max / v_cut))`.
pub fn transform_relative_loss(v_cut: f64, v_max: f64, v_bar: f64) -> f64 {
    if v_bar < 0.0 || v_max == 0.0 {
        return v_cut;
    }
    if v_bar >= 1.0 {
        return v_max;
    }
    v_cut * (v_bar * (v_max / v_cut).ln()).exp()
}

/// Interpolated cross section of a single process in a single medium.
pub struct CrossSection {
    param: Arc<dyn Parametrization>,
    particle: ParticleDef,
    medium: Medium,
    cut: EnergyCutSettings,
    hash: u64,
    dedx: Arc<Interpolant1d>,
    de2dx: Arc<Interpolant1d>,
    dndx: Vec<(ComponentId, Arc<Interpolant2d>)>,
}

impl CrossSection {
    /// Build (or fetch from the global cache) every table of this cross
    /// section. Construction is the only expensive step; it runs the
    /// adaptive quadrature at every grid node unless an identical
    /// configuration was built before.
    pub fn new(
        param: Arc<dyn Parametrization>,
        particle: &ParticleDef,
        medium: &Medium,
        cut: &EnergyCutSettings,
        def: &InterpolationDef,
    ) -> Result<Self, String> {
        let lower = param.lower_energy_lim().max(particle.mass);
        if !(lower > 0.0) {
            return Err(format!(
                "process '{}' has non-positive lower energy limit {}",
                param.name(),
                lower
            ));
        }
        if !(lower < def.max_node_energy) {
            return Err(format!(
                "process '{}': lower energy limit {} is not below max_node_energy {}",
                param.name(),
                lower,
                def.max_node_energy
            ));
        }

        let identity = [
            param.hash(),
            particle.hash(),
            medium.hash(),
            cut.hash(),
            def.hash(),
        ];
        let mut hash = 0u64;
        for &part in &identity {
            hash_combine(&mut hash, part);
        }

        let energy_axis = |nodes: usize| Axis {
            nodes,
            min: lower,
            max: def.max_node_energy,
            log: true,
        };
        let integral = Integral::default();

        let dedx_def = Interpolant1dDef {
            axis: energy_axis(def.nodes_cross_section),
            order: def.order,
            rational: true,
            log_values: true,
        };
        let dedx = cache::get_or_build_1d(table_key("dEdx", &identity), || {
            Interpolant1d::build(&dedx_def, |energy| {
                dedx_node(param.as_ref(), medium, cut, &integral, energy)
            })
        })?;

        let de2dx_def = Interpolant1dDef {
            axis: energy_axis(def.nodes_continuous_randomization),
            order: def.order,
            rational: false,
            log_values: false,
        };
        let de2dx = cache::get_or_build_1d(table_key("dE2dx", &identity), || {
            Interpolant1d::build(&de2dx_def, |energy| {
                de2dx_node(param.as_ref(), medium, cut, &integral, energy)
            })
        })?;

        let dndx_def = Interpolant2dDef {
            axis1: energy_axis(def.nodes_cross_section),
            axis2: Axis {
                nodes: def.nodes_cross_section,
                min: 0.0,
                max: 1.0,
                log: false,
            },
            order: def.order,
            rational: true,
            log_values: false,
        };
        let mut dndx = Vec::new();
        for id in targets(param.as_ref(), medium) {
            let mut hashes = identity.to_vec();
            hashes.push(cache::hash_of(&id));
            let table = cache::get_or_build_2d(table_key("dNdx", &hashes), || {
                Interpolant2d::build(&dndx_def, |energy, v_bar| {
                    dndx_node(param.as_ref(), medium, cut, &integral, id, energy, v_bar)
                })
            })?;
            dndx.push((id, table));
        }

        Ok(CrossSection {
            param,
            particle: particle.clone(),
            medium: medium.clone(),
            cut: *cut,
            hash,
            dedx,
            de2dx,
            dndx,
        })
    }

    pub fn particle(&self) -> &ParticleDef {
        &self.particle
    }

    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    /// Lower bound of the energy axis of every table of this cross
    /// section.
    pub fn lower_energy_lim(&self) -> f64 {
        self.param.lower_energy_lim().max(self.particle.mass)
    }

    /// Combined identity hash of everything that shaped the tables.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Average energy loss per grammage at `energy`, in MeV cm^2/g.
    /// Never negative; exactly zero for a disabled process.
    pub fn calculate_dedx(&self, energy: f64) -> f64 {
        let multiplier = self.param.multiplier();
        if multiplier <= 0.0 {
            return 0.0;
        }
        multiplier * self.dedx.interpolate(energy).max(0.0)
    }

    /// Average squared energy loss per grammage at `energy`.
    pub fn calculate_de2dx(&self, energy: f64) -> f64 {
        let multiplier = self.param.multiplier();
        if multiplier <= 0.0 {
            return 0.0;
        }
        multiplier * self.de2dx.interpolate(energy).max(0.0)
    }

    /// Total interaction rate per grammage at `energy`, per target.
    ///
    /// The returned values are the cumulative-rate tables evaluated at
    /// the upper end of the kinematic window; pass a fraction of one of
    /// them to [`CrossSection::calculate_stochastic_loss`] to invert it.
    pub fn calculate_dndx(&self, energy: f64) -> Rates {
        let multiplier = self.param.multiplier();
        let mut rates = Rates::with_capacity(self.dndx.len());
        for (id, table) in &self.dndx {
            let rate = if multiplier <= 0.0 {
                0.0
            } else {
                multiplier * table.interpolate(energy, 1.0).max(0.0)
            };
            rates.insert(*id, rate);
        }
        rates
    }

    /// Invert the cumulative rate of `component` at `energy` for the
    /// given target rate and return the absolute energy loss in MeV.
    ///
    /// `rate` must have been derived from the matching
    /// [`CrossSection::calculate_dndx`] entry (e.g. a uniform variate
    /// times the total rate); passing rates across components or
    /// energies yields physically meaningless losses.
    pub fn calculate_stochastic_loss(&self, component: ComponentId, energy: f64, rate: f64) -> f64 {
        let multiplier = self.param.multiplier();
        if multiplier <= 0.0 {
            return 0.0;
        }
        let table = self
            .dndx
            .iter()
            .find(|(id, _)| *id == component)
            .map(|(_, table)| table)
            .unwrap_or_else(|| {
                panic!(
                    "no dNdx table for {:?} in process '{}'",
                    component,
                    self.param.name()
                )
            });
        let target = component_of(&self.medium, component);
        let limits = self.param.kinematic_limits(energy, target);
        let v_cut = self.cut.get_cut(&limits, energy);
        if v_cut >= limits.v_max {
            // Degenerate window: the whole kinematic range is continuous.
            return energy * limits.v_max;
        }
        let v_bar = table.find_limit(energy, rate / multiplier);
        energy * transform_relative_loss(v_cut, limits.v_max, v_bar)
    }

    /// Select the interacting component by cumulative charge weight.
    ///
    /// `rnd` is an externally drawn uniform variate in [0, 1). Walks the
    /// components in medium order, accumulating
    /// `atoms_in_molecule * nuc_charge`, and returns the component at
    /// which the running sum crosses `rnd * sum_charge`.
    pub fn select_component(&self, rnd: f64) -> ComponentId {
        if !self.param.component_wise() {
            return ComponentId::Bulk;
        }
        let threshold = rnd * self.medium.sum_charge();
        let mut accumulated = 0.0;
        for (index, component) in self.medium.components().iter().enumerate() {
            accumulated += component.atoms_in_molecule * component.nuc_charge;
            if accumulated > threshold {
                return ComponentId::Component(index);
            }
        }
        panic!(
            "sum charge of medium '{}' was not initialized correctly",
            self.medium.name()
        );
    }

    /// Draw one complete stochastic loss: component selection, rate draw
    /// and inversion. Convenience wrapper around the explicit-variate
    /// API for callers that own a generator.
    pub fn sample_loss<R: Rng + ?Sized>(&self, energy: f64, rng: &mut R) -> StochasticLoss {
        let component = self.select_component(rng.gen());
        let rates = self.calculate_dndx(energy);
        let total = rates.get(&component).copied().unwrap_or(0.0);
        if total <= 0.0 {
            return StochasticLoss {
                component,
                v: 0.0,
                loss: 0.0,
            };
        }
        let loss = self.calculate_stochastic_loss(component, energy, rng.gen::<f64>() * total);
        StochasticLoss {
            component,
            v: loss / energy,
            loss,
        }
    }
}

fn targets(param: &dyn Parametrization, medium: &Medium) -> Vec<ComponentId> {
    if param.component_wise() {
        (0..medium.components().len())
            .map(ComponentId::Component)
            .collect()
    } else {
        vec![ComponentId::Bulk]
    }
}

fn component_of(medium: &Medium, id: ComponentId) -> Option<&Component> {
    match id {
        ComponentId::Bulk => None,
        ComponentId::Component(index) => Some(&medium.components()[index]),
    }
}

fn dedx_node(
    param: &dyn Parametrization,
    medium: &Medium,
    cut: &EnergyCutSettings,
    integral: &Integral,
    energy: f64,
) -> f64 {
    let mut sum = 0.0;
    for id in targets(param, medium) {
        let target = component_of(medium, id);
        let limits = param.kinematic_limits(energy, target);
        let v_cut = cut.get_cut(&limits, energy);
        let method = if limits.v_min > 0.0 {
            IntegrationMethod::LogSubstitution
        } else {
            IntegrationMethod::Closed
        };
        sum += integral.integrate(
            limits.v_min,
            v_cut,
            |v| v * param.differential_rate(energy, v, target),
            method,
        );
    }
    energy * sum
}

fn de2dx_node(
    param: &dyn Parametrization,
    medium: &Medium,
    cut: &EnergyCutSettings,
    integral: &Integral,
    energy: f64,
) -> f64 {
    let mut sum = 0.0;
    for id in targets(param, medium) {
        let target = component_of(medium, id);
        let limits = param.kinematic_limits(energy, target);
        let v_cut = cut.get_cut(&limits, energy);
        let method = if limits.v_min > 0.0 {
            IntegrationMethod::LogSubstitution
        } else {
            IntegrationMethod::Closed
        };
        sum += integral.integrate(
            limits.v_min,
            v_cut,
            |v| v * v * param.differential_rate(energy, v, target),
            method,
        );
    }
    energy * energy * sum
}

fn dndx_node(
    param: &dyn Parametrization,
    medium: &Medium,
    cut: &EnergyCutSettings,
    integral: &Integral,
    id: ComponentId,
    energy: f64,
    v_bar: f64,
) -> f64 {
    let target = component_of(medium, id);
    let limits = param.kinematic_limits(energy, target);
    let v_cut = cut.get_cut(&limits, energy);
    if v_cut >= limits.v_max {
        return 0.0;
    }
    let v = transform_relative_loss(v_cut, limits.v_max, v_bar);
    integral.integrate(
        v_cut,
        v,
        |v| param.differential_rate(energy, v, target),
        IntegrationMethod::LogSubstitution,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parametrization::KinematicLimits;

    // Ionization-like test process: rate ~ Z_eff / v^2 with a fixed
    // kinematic window, component-resolved.
    struct PowerLawProcess {
        multiplier: f64,
        component_wise: bool,
    }

    impl PowerLawProcess {
        fn enabled() -> Self {
            PowerLawProcess {
                multiplier: 1.0,
                component_wise: true,
            }
        }
    }

    impl Parametrization for PowerLawProcess {
        fn name(&self) -> &str {
            "power_law"
        }

        fn kinematic_limits(&self, _energy: f64, _component: Option<&Component>) -> KinematicLimits {
            KinematicLimits {
                v_min: 1e-5,
                v_max: 0.1,
            }
        }

        fn differential_rate(&self, _energy: f64, v: f64, component: Option<&Component>) -> f64 {
            let weight = component
                .map(|c| c.atoms_in_molecule * c.nuc_charge)
                .unwrap_or(10.0);
            0.5 * weight / (v * v)
        }

        fn lower_energy_lim(&self) -> f64 {
            crate::constants::MUON_MASS
        }

        fn multiplier(&self) -> f64 {
            self.multiplier
        }

        fn component_wise(&self) -> bool {
            self.component_wise
        }

        fn hash(&self) -> u64 {
            let mut hasher = DefaultHasher::new();
            hasher.write(self.name().as_bytes());
            hasher.write_u64(self.multiplier.to_bits());
            hasher.write_u8(self.component_wise as u8);
            hasher.finish()
        }
    }

    fn small_def() -> InterpolationDef {
        InterpolationDef {
            nodes_cross_section: 30,
            nodes_continuous_randomization: 30,
            max_node_energy: 1e8,
            order: 5,
        }
    }

    fn build(process: PowerLawProcess) -> CrossSection {
        CrossSection::new(
            Arc::new(process),
            &ParticleDef::muon(),
            &Medium::water(),
            &EnergyCutSettings::new(1e4, 1.0).unwrap(),
            &small_def(),
        )
        .unwrap()
    }

    #[test]
    fn test_dedx_is_non_negative_over_domain() {
        let cross = build(PowerLawProcess::enabled());
        let mut energy = 150.0;
        while energy < 1e8 {
            assert!(
                cross.calculate_dedx(energy) >= 0.0,
                "negative dEdx at {}",
                energy
            );
            energy *= 3.0;
        }
    }

    #[test]
    fn test_disabled_process_yields_exact_zero() {
        let cross = build(PowerLawProcess {
            multiplier: 0.0,
            component_wise: true,
        });
        for &energy in &[200.0, 1e4, 1e6, 1e8] {
            assert_eq!(cross.calculate_dedx(energy), 0.0);
            assert_eq!(cross.calculate_de2dx(energy), 0.0);
            for (_, rate) in cross.calculate_dndx(energy) {
                assert_eq!(rate, 0.0);
            }
            assert_eq!(
                cross.calculate_stochastic_loss(ComponentId::Component(0), energy, 1.0),
                0.0
            );
        }
    }

    #[test]
    fn test_dndx_has_one_entry_per_component() {
        let cross = build(PowerLawProcess::enabled());
        let rates = cross.calculate_dndx(1e6);
        assert_eq!(rates.len(), 2);
        assert!(rates[&ComponentId::Component(0)] > 0.0);
        assert!(rates[&ComponentId::Component(1)] > 0.0);
    }

    #[test]
    fn test_bulk_process_has_single_aggregate_table() {
        let cross = build(PowerLawProcess {
            multiplier: 1.0,
            component_wise: false,
        });
        let rates = cross.calculate_dndx(1e6);
        assert_eq!(rates.len(), 1);
        assert!(rates[&ComponentId::Bulk] > 0.0);
        assert_eq!(cross.select_component(0.99), ComponentId::Bulk);
    }

    #[test]
    fn test_stochastic_loss_stays_in_kinematic_window() {
        let cross = build(PowerLawProcess::enabled());
        let energy = 1e6;
        let rates = cross.calculate_dndx(energy);
        for &id in &[ComponentId::Component(0), ComponentId::Component(1)] {
            let total = rates[&id];
            for &fraction in &[0.1, 0.5, 0.9] {
                let loss = cross.calculate_stochastic_loss(id, energy, fraction * total);
                let v = loss / energy;
                // v_cut = 1e4 / 1e6 = 0.01, v_max = 0.1
                assert!(
                    v >= 0.01 && v <= 0.1,
                    "{:?} fraction {}: v = {}",
                    id,
                    fraction,
                    v
                );
            }
        }
    }

    #[test]
    fn test_component_selection_walks_charge_weights() {
        let cross = build(PowerLawProcess::enabled());
        // Water: H contributes 2/10 of the total charge, O the rest.
        assert_eq!(cross.select_component(0.0), ComponentId::Component(0));
        assert_eq!(cross.select_component(0.19), ComponentId::Component(0));
        assert_eq!(cross.select_component(0.21), ComponentId::Component(1));
        assert_eq!(cross.select_component(0.999), ComponentId::Component(1));
    }

    #[test]
    fn test_transform_relative_loss_edges() {
        assert_eq!(transform_relative_loss(0.01, 0.1, -0.5), 0.01);
        assert_eq!(transform_relative_loss(0.01, 0.1, 0.0), 0.01);
        assert_eq!(transform_relative_loss(0.01, 0.1, 1.0), 0.1);
        assert_eq!(transform_relative_loss(0.01, 0.0, 0.5), 0.01);
        let mid = transform_relative_loss(0.01, 0.1, 0.5);
        assert!(mid > 0.01 && mid < 0.1);
    }

    #[test]
    fn test_identity_hash_tracks_configuration() {
        let a = build(PowerLawProcess::enabled());
        let b = build(PowerLawProcess::enabled());
        assert_eq!(a.hash(), b.hash());
        let c = CrossSection::new(
            Arc::new(PowerLawProcess::enabled()),
            &ParticleDef::muon(),
            &Medium::ice(),
            &EnergyCutSettings::new(1e4, 1.0).unwrap(),
            &small_def(),
        )
        .unwrap();
        assert_ne!(a.hash(), c.hash());
    }
}
