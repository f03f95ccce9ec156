// Physical constants and numerical defaults shared across the crate.
//
// Energies and masses are in MeV, lengths in cm, times in ns, grammage in
// g/cm^2. All cross section rates are per grammage.

/// Speed of light in cm/ns.
pub const SPEED_OF_LIGHT: f64 = 29.979_245_8;

/// Muon rest mass in MeV.
pub const MUON_MASS: f64 = 105.658_374_5;

/// Tau rest mass in MeV.
pub const TAU_MASS: f64 = 1_776.86;

/// Electron rest mass in MeV.
pub const ELECTRON_MASS: f64 = 0.510_998_946_1;

/// Default Romberg extrapolation order for adaptive quadrature.
pub const ROMBERG_ORDER: usize = 5;

/// Default maximum number of interval refinements before the integrator
/// gives up and returns its best estimate.
pub const MAX_REFINEMENTS: usize = 16;

/// Default relative precision target for adaptive quadrature.
pub const INTEGRATION_PRECISION: f64 = 1e-6;
