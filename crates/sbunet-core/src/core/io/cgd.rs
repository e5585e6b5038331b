use crate::core::io::traits::StructureWriter;
use crate::core::models::structure::Structure;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CgdError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("A net can only be written for a periodic structure")]
    MissingLattice,
    #[error("Bond refers to a removed atom")]
    DanglingBond,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgdWriteOptions {
    /// Append an `# EDGE_CENTER` comment per edge with its fractional midpoint.
    pub write_edge_centers: bool,
}

impl Default for CgdWriteOptions {
    fn default() -> Self {
        Self {
            write_edge_centers: true,
        }
    }
}

/// Writer for Systre crystallographic net descriptions.
///
/// Every atom becomes a `NODE` with its coordination number and fractional
/// coordinates. Every bond becomes an `EDGE` between the begin atom and the
/// end atom translated by the bond's image vector. The net is always written
/// in P1.
pub struct CgdFile;

impl StructureWriter for CgdFile {
    type Options = CgdWriteOptions;
    type Error = CgdError;

    fn write_to(
        structure: &Structure,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let lattice = structure.lattice().ok_or(CgdError::MissingLattice)?;
        let indent = "  ";

        writeln!(writer, "# CGD file generated by sbunet")?;
        writeln!(writer, "CRYSTAL")?;
        writeln!(writer, "{indent}NAME {}", structure.title())?;
        writeln!(writer, "{indent}GROUP P1")?;
        let [a, b, c, alpha, beta, gamma] = lattice.parameters();
        writeln!(
            writer,
            "{indent}CELL {a:.4} {b:.4} {c:.4} {alpha:.4} {beta:.4} {gamma:.4}"
        )?;

        for (index, (id, atom)) in structure.atoms_iter().enumerate() {
            let frac = lattice.cartesian_to_fractional(&atom.position);
            writeln!(
                writer,
                "{indent}NODE {} {} {:.5} {:.5} {:.5}",
                index + 1,
                structure.degree(id),
                frac.x,
                frac.y,
                frac.z
            )?;
        }

        let mut edge_centers = String::new();
        for (_, bond) in structure.bonds_iter() {
            let (Some(begin), Some(end)) = (structure.atom(bond.begin), structure.atom(bond.end))
            else {
                return Err(CgdError::DanglingBond);
            };
            let begin = lattice.cartesian_to_fractional(&begin.position);
            let end = lattice.cartesian_to_fractional(&end.position) + bond.image.to_fractional();
            writeln!(
                writer,
                "{indent}EDGE  {:.5} {:.5} {:.5}   {:.5} {:.5} {:.5}",
                begin.x, begin.y, begin.z, end.x, end.y, end.z
            )?;
            let center = (begin + end) / 2.0;
            edge_centers.push_str(&format!(
                "# EDGE_CENTER  {:.5} {:.5} {:.5}\n",
                center.x, center.y, center.z
            ));
        }

        if options.write_edge_centers {
            write!(writer, "{edge_centers}")?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}
