// Energy-loss cross section tables and stochastic sampling for charged
// particle Monte Carlo transport.
//
// The build pipeline is: adaptive quadrature (integral) -> tabulated
// interpolants (interpolant) -> global identity-keyed cache (cache) ->
// per-process cross section tables (crosssection) -> deterministic
// propagation consumers (propagation). Physics parametrizations enter
// through the trait in `parametrization`; media, particles and cuts are
// plain validated values.

pub mod cache;
pub mod constants;
pub mod crosssection;
pub mod cut;
pub mod integral;
pub mod interpolant;
pub mod medium;
pub mod parametrization;
pub mod particle;
pub mod propagation;

pub use crosssection::{
    transform_relative_loss, ComponentId, CrossSection, InterpolationDef, Rates, StochasticLoss,
};
pub use cut::EnergyCutSettings;
pub use integral::{Integral, IntegrationMethod};
pub use interpolant::{Axis, Interpolant1d, Interpolant1dDef, Interpolant2d, Interpolant2dDef};
pub use medium::{Component, Medium};
pub use parametrization::{KinematicLimits, Parametrization};
pub use particle::ParticleDef;
pub use propagation::{
    ApproximateTimeBuilder, Displacement, DisplacementInterpolant, ExactTimeBuilder, Time,
};
