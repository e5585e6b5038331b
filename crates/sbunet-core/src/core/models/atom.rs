use nalgebra::Point3;

/// Maximum Euclidean distance, in Angstroms, at which two atoms from different
/// structures are considered to occupy the same site.
pub const POSITION_TOLERANCE: f64 = 1.0e-6;

/// Represents an atom of a periodic structure.
///
/// The species is stored as an atomic number. Synthetic labels produced while
/// collapsing building units reuse the same field, so a pseudo-atom standing in
/// for a linker is indistinguishable from an ordinary atom of that element.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atomic number or synthetic species label (0..=118).
    pub atomic_number: u8,
    /// Isotope tag; zero means natural abundance.
    pub isotope: u16,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Formal charge annotation. Reset before canonicalization.
    pub formal_charge: i8,
    /// Spin multiplicity annotation. Reset before canonicalization.
    pub spin_multiplicity: u8,
    /// Hybridization annotation. Reset before canonicalization.
    pub hybridization: u8,
    /// Site label carried over from the input file, if any.
    pub label: Option<String>,
}

impl Atom {
    /// Creates a new `Atom` of the given species with all annotations cleared.
    ///
    /// # Arguments
    ///
    /// * `atomic_number` - The element or synthetic label of the atom.
    /// * `position` - The Cartesian coordinates of the atom.
    pub fn new(atomic_number: u8, position: Point3<f64>) -> Self {
        Self {
            atomic_number,
            isotope: 0,
            position,
            formal_charge: 0,
            spin_multiplicity: 0,
            hybridization: 0,
            label: None,
        }
    }

    /// Creates a synthetic atom (pseudo-atom or connector) that carries only a
    /// species label and a position.
    pub fn pseudo(label: u8, position: Point3<f64>) -> Self {
        Self::new(label, position)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_isotope(mut self, isotope: u16) -> Self {
        self.isotope = isotope;
        self
    }

    /// Clears charge, spin and hybridization annotations.
    pub fn reset_annotations(&mut self) {
        self.formal_charge = 0;
        self.spin_multiplicity = 0;
        self.hybridization = 0;
    }

    /// Returns `true` if `other` describes the same site: same species, same
    /// isotope, and coordinates within [`POSITION_TOLERANCE`].
    pub fn corresponds_to(&self, other: &Atom) -> bool {
        self.atomic_number == other.atomic_number
            && self.isotope == other.isotope
            && (self.position - other.position).norm() <= POSITION_TOLERANCE
    }
}
