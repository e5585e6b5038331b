use phf::{phf_map, phf_set};

/// Static per-element data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    /// Standard atomic weight in Daltons.
    pub mass: f64,
    /// Single-bond covalent radius in Angstroms.
    pub covalent_radius: f64,
}

impl Element {
    const fn new(symbol: &'static str, mass: f64, covalent_radius: f64) -> Self {
        Self {
            symbol,
            mass,
            covalent_radius,
        }
    }
}

/// Indexed by atomic number. Entry 0 is the dummy element.
static ELEMENTS: [Element; 119] = [
    Element::new("Xx", 0.0, 0.00),
    Element::new("H", 1.008, 0.31),
    Element::new("He", 4.0026, 0.28),
    Element::new("Li", 6.94, 1.28),
    Element::new("Be", 9.0122, 0.96),
    Element::new("B", 10.81, 0.84),
    Element::new("C", 12.011, 0.76),
    Element::new("N", 14.007, 0.71),
    Element::new("O", 15.999, 0.66),
    Element::new("F", 18.998, 0.57),
    Element::new("Ne", 20.18, 0.58),
    Element::new("Na", 22.99, 1.66),
    Element::new("Mg", 24.305, 1.41),
    Element::new("Al", 26.982, 1.21),
    Element::new("Si", 28.085, 1.11),
    Element::new("P", 30.974, 1.07),
    Element::new("S", 32.06, 1.05),
    Element::new("Cl", 35.45, 1.02),
    Element::new("Ar", 39.948, 1.06),
    Element::new("K", 39.098, 2.03),
    Element::new("Ca", 40.078, 1.76),
    Element::new("Sc", 44.956, 1.70),
    Element::new("Ti", 47.867, 1.60),
    Element::new("V", 50.942, 1.53),
    Element::new("Cr", 51.996, 1.39),
    Element::new("Mn", 54.938, 1.39),
    Element::new("Fe", 55.845, 1.32),
    Element::new("Co", 58.933, 1.26),
    Element::new("Ni", 58.693, 1.24),
    Element::new("Cu", 63.546, 1.32),
    Element::new("Zn", 65.38, 1.22),
    Element::new("Ga", 69.723, 1.22),
    Element::new("Ge", 72.63, 1.20),
    Element::new("As", 74.922, 1.19),
    Element::new("Se", 78.971, 1.20),
    Element::new("Br", 79.904, 1.20),
    Element::new("Kr", 83.798, 1.16),
    Element::new("Rb", 85.468, 2.20),
    Element::new("Sr", 87.62, 1.95),
    Element::new("Y", 88.906, 1.90),
    Element::new("Zr", 91.224, 1.75),
    Element::new("Nb", 92.906, 1.64),
    Element::new("Mo", 95.95, 1.54),
    Element::new("Tc", 98.0, 1.47),
    Element::new("Ru", 101.07, 1.46),
    Element::new("Rh", 102.91, 1.42),
    Element::new("Pd", 106.42, 1.39),
    Element::new("Ag", 107.87, 1.45),
    Element::new("Cd", 112.41, 1.44),
    Element::new("In", 114.82, 1.42),
    Element::new("Sn", 118.71, 1.39),
    Element::new("Sb", 121.76, 1.39),
    Element::new("Te", 127.6, 1.38),
    Element::new("I", 126.9, 1.39),
    Element::new("Xe", 131.29, 1.40),
    Element::new("Cs", 132.91, 2.44),
    Element::new("Ba", 137.33, 2.15),
    Element::new("La", 138.91, 2.07),
    Element::new("Ce", 140.12, 2.04),
    Element::new("Pr", 140.91, 2.03),
    Element::new("Nd", 144.24, 2.01),
    Element::new("Pm", 145.0, 1.99),
    Element::new("Sm", 150.36, 1.98),
    Element::new("Eu", 151.96, 1.98),
    Element::new("Gd", 157.25, 1.96),
    Element::new("Tb", 158.93, 1.94),
    Element::new("Dy", 162.5, 1.92),
    Element::new("Ho", 164.93, 1.92),
    Element::new("Er", 167.26, 1.89),
    Element::new("Tm", 168.93, 1.90),
    Element::new("Yb", 173.05, 1.87),
    Element::new("Lu", 174.97, 1.87),
    Element::new("Hf", 178.49, 1.75),
    Element::new("Ta", 180.95, 1.70),
    Element::new("W", 183.84, 1.62),
    Element::new("Re", 186.21, 1.51),
    Element::new("Os", 190.23, 1.44),
    Element::new("Ir", 192.22, 1.41),
    Element::new("Pt", 195.08, 1.36),
    Element::new("Au", 196.97, 1.36),
    Element::new("Hg", 200.59, 1.32),
    Element::new("Tl", 204.38, 1.45),
    Element::new("Pb", 207.2, 1.46),
    Element::new("Bi", 208.98, 1.48),
    Element::new("Po", 209.0, 1.40),
    Element::new("At", 210.0, 1.50),
    Element::new("Rn", 222.0, 1.50),
    Element::new("Fr", 223.0, 2.60),
    Element::new("Ra", 226.0, 2.21),
    Element::new("Ac", 227.0, 2.15),
    Element::new("Th", 232.04, 2.06),
    Element::new("Pa", 231.04, 2.00),
    Element::new("U", 238.03, 1.96),
    Element::new("Np", 237.0, 1.90),
    Element::new("Pu", 244.0, 1.87),
    Element::new("Am", 243.0, 1.80),
    Element::new("Cm", 247.0, 1.69),
    Element::new("Bk", 247.0, 1.60),
    Element::new("Cf", 251.0, 1.60),
    Element::new("Es", 252.0, 1.60),
    Element::new("Fm", 257.0, 1.60),
    Element::new("Md", 258.0, 1.60),
    Element::new("No", 259.0, 1.60),
    Element::new("Lr", 266.0, 1.60),
    Element::new("Rf", 267.0, 1.60),
    Element::new("Db", 268.0, 1.60),
    Element::new("Sg", 269.0, 1.60),
    Element::new("Bh", 270.0, 1.60),
    Element::new("Hs", 277.0, 1.60),
    Element::new("Mt", 278.0, 1.60),
    Element::new("Ds", 281.0, 1.60),
    Element::new("Rg", 282.0, 1.60),
    Element::new("Cn", 285.0, 1.60),
    Element::new("Nh", 286.0, 1.60),
    Element::new("Fl", 289.0, 1.60),
    Element::new("Mc", 290.0, 1.60),
    Element::new("Lv", 293.0, 1.60),
    Element::new("Ts", 294.0, 1.60),
    Element::new("Og", 294.0, 1.60),
];

static SYMBOL_TO_NUMBER: phf::Map<&'static str, u8> = phf_map! {
    "H" => 1,
    "He" => 2,
    "Li" => 3,
    "Be" => 4,
    "B" => 5,
    "C" => 6,
    "N" => 7,
    "O" => 8,
    "F" => 9,
    "Ne" => 10,
    "Na" => 11,
    "Mg" => 12,
    "Al" => 13,
    "Si" => 14,
    "P" => 15,
    "S" => 16,
    "Cl" => 17,
    "Ar" => 18,
    "K" => 19,
    "Ca" => 20,
    "Sc" => 21,
    "Ti" => 22,
    "V" => 23,
    "Cr" => 24,
    "Mn" => 25,
    "Fe" => 26,
    "Co" => 27,
    "Ni" => 28,
    "Cu" => 29,
    "Zn" => 30,
    "Ga" => 31,
    "Ge" => 32,
    "As" => 33,
    "Se" => 34,
    "Br" => 35,
    "Kr" => 36,
    "Rb" => 37,
    "Sr" => 38,
    "Y" => 39,
    "Zr" => 40,
    "Nb" => 41,
    "Mo" => 42,
    "Tc" => 43,
    "Ru" => 44,
    "Rh" => 45,
    "Pd" => 46,
    "Ag" => 47,
    "Cd" => 48,
    "In" => 49,
    "Sn" => 50,
    "Sb" => 51,
    "Te" => 52,
    "I" => 53,
    "Xe" => 54,
    "Cs" => 55,
    "Ba" => 56,
    "La" => 57,
    "Ce" => 58,
    "Pr" => 59,
    "Nd" => 60,
    "Pm" => 61,
    "Sm" => 62,
    "Eu" => 63,
    "Gd" => 64,
    "Tb" => 65,
    "Dy" => 66,
    "Ho" => 67,
    "Er" => 68,
    "Tm" => 69,
    "Yb" => 70,
    "Lu" => 71,
    "Hf" => 72,
    "Ta" => 73,
    "W" => 74,
    "Re" => 75,
    "Os" => 76,
    "Ir" => 77,
    "Pt" => 78,
    "Au" => 79,
    "Hg" => 80,
    "Tl" => 81,
    "Pb" => 82,
    "Bi" => 83,
    "Po" => 84,
    "At" => 85,
    "Rn" => 86,
    "Fr" => 87,
    "Ra" => 88,
    "Ac" => 89,
    "Th" => 90,
    "Pa" => 91,
    "U" => 92,
    "Np" => 93,
    "Pu" => 94,
    "Am" => 95,
    "Cm" => 96,
    "Bk" => 97,
    "Cf" => 98,
    "Es" => 99,
    "Fm" => 100,
    "Md" => 101,
    "No" => 102,
    "Lr" => 103,
    "Rf" => 104,
    "Db" => 105,
    "Sg" => 106,
    "Bh" => 107,
    "Hs" => 108,
    "Mt" => 109,
    "Ds" => 110,
    "Rg" => 111,
    "Cn" => 112,
    "Nh" => 113,
    "Fl" => 114,
    "Mc" => 115,
    "Lv" => 116,
    "Ts" => 117,
    "Og" => 118,
};

// Elements treated as non-metals when partitioning a framework.
static NONMETALS: phf::Set<u8> = phf_set! {
    1u8, 2u8, 5u8, 6u8, 7u8, 8u8, 9u8, 10u8, 14u8, 15u8, 16u8, 17u8, 18u8, 32u8, 33u8, 34u8, 35u8, 36u8, 52u8, 53u8, 54u8, 85u8, 86u8
};

pub const HYDROGEN: u8 = 1;

pub fn element(atomic_number: u8) -> Option<&'static Element> {
    ELEMENTS.get(atomic_number as usize)
}

pub fn symbol(atomic_number: u8) -> &'static str {
    element(atomic_number).map_or("Xx", |e| e.symbol)
}

pub fn atomic_mass(atomic_number: u8) -> f64 {
    element(atomic_number).map_or(0.0, |e| e.mass)
}

pub fn covalent_radius(atomic_number: u8) -> f64 {
    element(atomic_number).map_or(0.0, |e| e.covalent_radius)
}

/// Resolves an element symbol, ignoring case (`"ZN"`, `"zn"` and `"Zn"` all
/// resolve to 30).
pub fn atomic_number(symbol: &str) -> Option<u8> {
    let mut chars = symbol.trim().chars();
    let first = chars.next()?;
    let normalized: String = first
        .to_uppercase()
        .chain(chars.flat_map(|c| c.to_lowercase()))
        .collect();
    SYMBOL_TO_NUMBER.get(normalized.as_str()).copied()
}

/// Returns `true` for every element outside the fixed non-metal list,
/// including the dummy element 0.
pub fn is_metal(atomic_number: u8) -> bool {
    !NONMETALS.contains(&atomic_number)
}
