// Time and displacement integrators on top of built cross sections.

mod common;

use std::sync::Arc;

use common::{muon_water_cross_relative_cut, test_def, TestIonization};
use eloss_mc::{
    ApproximateTimeBuilder, CrossSection, Displacement, EnergyCutSettings, ExactTimeBuilder,
    Medium, ParticleDef, Time,
};

fn muon_cross_sections() -> Vec<Arc<CrossSection>> {
    vec![Arc::new(muon_water_cross_relative_cut())]
}

fn photon_cross_sections() -> Vec<Arc<CrossSection>> {
    let process = TestIonization {
        lower_energy_lim: 1.0,
        ..TestIonization::default()
    };
    let cross = CrossSection::new(
        Arc::new(process),
        &ParticleDef::photon(),
        &Medium::water(),
        &EnergyCutSettings::new(f64::INFINITY, 0.05).unwrap(),
        &test_def(),
    )
    .unwrap();
    vec![Arc::new(cross)]
}

#[test]
fn test_approximate_time_zero_distance() {
    // No time elapses if no distance is propagated.
    let time = ApproximateTimeBuilder;
    assert_eq!(time.time_elapsed(1e6, 1e6, 0.0, 1.0), 0.0);
}

#[test]
fn test_exact_time_zero_energy_difference() {
    let time = ExactTimeBuilder::new(muon_cross_sections(), &ParticleDef::muon()).unwrap();
    assert_eq!(time.time_elapsed(1e6, 1e6, 0.0, 1.0), 0.0);
}

#[test]
fn test_displacement_zero_energy_difference() {
    let displacement = Displacement::new(muon_cross_sections()).unwrap();
    assert_eq!(displacement.solve_track_integral(1e6, 1e6), 0.0);
}

#[test]
fn test_approximate_time_grows_with_distance() {
    let time = ApproximateTimeBuilder;
    let density = Medium::water().mass_density();
    let mut previous = 0.0;
    for step in 1..30 {
        let grammage = 10f64.powf(step as f64 * 0.25);
        let elapsed = time.time_elapsed(0.0, 0.0, grammage, density);
        assert!(elapsed > previous);
        previous = elapsed;
    }
}

#[test]
fn test_exact_time_grows_with_energy_difference() {
    let time = ExactTimeBuilder::new(muon_cross_sections(), &ParticleDef::muon()).unwrap();
    let density = Medium::water().mass_density();
    let e_f = 1e3;
    let mut previous = 0.0;
    let mut e_i = 3e3;
    while e_i < 1e8 {
        let elapsed = time.time_elapsed(e_i, e_f, 0.0, density);
        assert!(
            elapsed > previous,
            "elapsed {} at e_i {} not above {}",
            elapsed,
            e_i,
            previous
        );
        previous = elapsed;
        e_i *= 2.0;
    }
}

#[test]
fn test_exact_time_exceeds_approximate_below_relativistic_limit() {
    // A massive particle is slower than light, so the exact elapsed time
    // must exceed the v = c approximation over the same grammage.
    let crosses = muon_cross_sections();
    let density = Medium::water().mass_density();
    let displacement = Displacement::new(crosses.clone()).unwrap();
    let exact = ExactTimeBuilder::new(crosses, &ParticleDef::muon()).unwrap();
    let approx = ApproximateTimeBuilder;

    let (e_i, e_f) = (500.0, 200.0);
    let grammage = displacement.solve_track_integral(e_i, e_f);
    assert!(grammage > 0.0);

    let elapsed_exact = exact.time_elapsed(e_i, e_f, grammage, density);
    let elapsed_approx = approx.time_elapsed(e_i, e_f, grammage, density);
    assert!(
        elapsed_exact > elapsed_approx,
        "exact {} not above approximate {}",
        elapsed_exact,
        elapsed_approx
    );
    // At a few hundred MeV the muon is still close enough to c that the
    // two estimates agree to well within a factor of two.
    assert!(elapsed_exact < 2.0 * elapsed_approx);
}

#[test]
fn test_massless_particle_travels_at_light_speed() {
    let crosses = photon_cross_sections();
    let density = Medium::water().mass_density();
    let displacement = Displacement::new(crosses.clone()).unwrap();
    let exact = ExactTimeBuilder::new(crosses, &ParticleDef::photon()).unwrap();
    let approx = ApproximateTimeBuilder;

    let (e_i, e_f) = (1e6, 1e4);
    let grammage = displacement.solve_track_integral(e_i, e_f);
    let elapsed_exact = exact.time_elapsed(e_i, e_f, grammage, density);
    let elapsed_approx = approx.time_elapsed(e_i, e_f, grammage, density);
    assert!(
        ((elapsed_exact - elapsed_approx) / elapsed_exact).abs() < 1e-9,
        "exact {} vs approximate {}",
        elapsed_exact,
        elapsed_approx
    );
}

#[test]
fn test_interpolated_track_integral_matches_quadrature() {
    let displacement = Displacement::new(muon_cross_sections()).unwrap();
    let interpolated = displacement.interpolated(&test_def()).unwrap();

    let e_f = 1e3;
    let mut e_i = 1e4;
    while e_i < 1e8 {
        let integrated = displacement.solve_track_integral(e_i, e_f);
        let tabulated = interpolated.solve_track_integral(e_i, e_f);
        assert!(
            ((integrated - tabulated) / integrated).abs() < 1e-3,
            "e_i {}: integral {} vs interpolant {}",
            e_i,
            integrated,
            tabulated
        );
        e_i *= 10.0;
    }
}
