// Media and their components, as seen by the cross section tables.
//
// Only the properties the tables and the sampler consume live here: the
// ordered component list with charges and abundances, the mass density and
// the charge-weighted sums. Everything is validated once at construction;
// the transport loop never re-checks it.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

/// One atomic component of a medium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component name, e.g. "O" or "H".
    pub name: String,
    /// Nuclear charge Z.
    pub nuc_charge: f64,
    /// Atomic mass number A.
    pub atomic_num: f64,
    /// Number of atoms of this component per molecule of the medium.
    pub atoms_in_molecule: f64,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        nuc_charge: f64,
        atomic_num: f64,
        atoms_in_molecule: f64,
    ) -> Self {
        Component {
            name: name.into(),
            nuc_charge,
            atomic_num,
            atoms_in_molecule,
        }
    }
}

/// A medium: an ordered list of components plus its bulk density.
///
/// The component order is part of the medium's identity; component
/// selection during stochastic sampling walks the list in this order, so
/// two media with reordered components are deliberately not
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    name: String,
    components: Vec<Component>,
    /// Mass density in g/cm^3.
    mass_density: f64,
    /// Sum of atoms_in_molecule * nuc_charge over all components.
    sum_charge: f64,
}

impl Medium {
    /// Create a medium, validating it for use in transport.
    ///
    /// The total charge is computed here, once, and never re-derived along
    /// other code paths; a medium that passes construction can always be
    /// used for component selection.
    pub fn new(
        name: impl Into<String>,
        components: Vec<Component>,
        mass_density: f64,
    ) -> Result<Self, String> {
        let name = name.into();
        if components.is_empty() {
            return Err(format!("medium '{}' has no components", name));
        }
        if !(mass_density > 0.0) {
            return Err(format!(
                "medium '{}' must have a positive mass density, got {}",
                name, mass_density
            ));
        }
        let mut sum_charge = 0.0;
        for component in &components {
            if !(component.nuc_charge > 0.0) {
                return Err(format!(
                    "component '{}' of medium '{}' has non-positive charge {}",
                    component.name, name, component.nuc_charge
                ));
            }
            if !(component.atoms_in_molecule > 0.0) {
                return Err(format!(
                    "component '{}' of medium '{}' has non-positive abundance {}",
                    component.name, name, component.atoms_in_molecule
                ));
            }
            sum_charge += component.atoms_in_molecule * component.nuc_charge;
        }
        if !(sum_charge > 0.0) {
            return Err(format!(
                "medium '{}' has non-positive total charge {}",
                name, sum_charge
            ));
        }
        Ok(Medium {
            name,
            components,
            mass_density,
            sum_charge,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn mass_density(&self) -> f64 {
        self.mass_density
    }

    pub fn sum_charge(&self) -> f64 {
        self.sum_charge
    }

    /// Identity hash over everything that shapes built tables.
    pub fn hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(self.name.as_bytes());
        for component in &self.components {
            hasher.write(component.name.as_bytes());
            hasher.write_u64(component.nuc_charge.to_bits());
            hasher.write_u64(component.atomic_num.to_bits());
            hasher.write_u64(component.atoms_in_molecule.to_bits());
        }
        hasher.write_u64(self.mass_density.to_bits());
        hasher.finish()
    }

    /// Liquid water (H2O).
    pub fn water() -> Self {
        Medium::new(
            "water",
            vec![
                Component::new("H", 1.0, 1.008, 2.0),
                Component::new("O", 8.0, 15.999, 1.0),
            ],
            1.0,
        )
        .expect("preset medium is valid")
    }

    /// Glacial ice (H2O at reduced density).
    pub fn ice() -> Self {
        Medium::new(
            "ice",
            vec![
                Component::new("H", 1.0, 1.008, 2.0),
                Component::new("O", 8.0, 15.999, 1.0),
            ],
            0.917,
        )
        .expect("preset medium is valid")
    }

    /// Standard rock: a single effective component with Z = 11, A = 22.
    pub fn standard_rock() -> Self {
        Medium::new(
            "standard_rock",
            vec![Component::new("rock", 11.0, 22.0, 1.0)],
            2.65,
        )
        .expect("preset medium is valid")
    }
}
