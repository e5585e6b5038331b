use crate::config::{AppConfig, OutputConfig};
use crate::error::{CliError, Result};
use sbunet::{
    core::io::{
        cgd::{CgdFile, CgdWriteOptions},
        cif::{CifFile, CifReadOptions, CifWriteOptions},
        keys::write_key_report_to_path,
        traits::{StructureReader, StructureWriter},
    },
    core::models::structure::Structure,
    engine::progress::ProgressReporter,
    workflows::{self, decompose::Decomposition},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const PARTIAL_NET_FILE: &str = "test_partial.cif";
pub const NODES_FILE: &str = "nodes.cif";
pub const LINKERS_FILE: &str = "linkers.cif";
pub const ORIGINAL_FILE: &str = "orig_mol.cif";
pub const CONDENSED_FILE: &str = "condensed_linkers.cif";
pub const KEYS_FILE: &str = "keys_for_condensed_linkers.txt";
pub const REDUCED_FILE: &str = "removed_two_conn_for_topology.cif";
pub const TOPOLOGY_FILE: &str = "topology.cgd";

/// Reads the input, decomposes it and writes every artifact.
///
/// Only an unreadable input is an error. A failed decomposition or a failed
/// write is logged and yields `Ok(None)`.
pub fn run(config: &AppConfig, reporter: &ProgressReporter) -> Result<Option<Decomposition>> {
    info!("Loading input structure from {:?}", &config.input_path);
    let structure = CifFile::read_from_path(&config.input_path, &CifReadOptions::default())
        .map_err(|e| {
            println!("Error reading file: {}", config.input_path.display());
            CliError::FileParsing {
                path: config.input_path.clone(),
                source: e.into(),
            }
        })?;
    info!(
        atoms = structure.atom_count(),
        bonds = structure.bond_count(),
        "Structure loaded"
    );

    match decompose_and_write(&structure, config, reporter) {
        Ok(decomposition) => Ok(Some(decomposition)),
        Err(e) => {
            error!("Decomposition of {:?} failed: {}", &config.input_path, e);
            Ok(None)
        }
    }
}

fn decompose_and_write(
    structure: &Structure,
    config: &AppConfig,
    reporter: &ProgressReporter,
) -> Result<Decomposition> {
    info!("Invoking the core decomposition workflow...");
    let decomposition = workflows::decompose::run(structure, &config.core_config, reporter)?;

    write_outputs(&decomposition, &config.output)?;
    print_signatures(&decomposition);

    Ok(decomposition)
}

fn write_outputs(decomposition: &Decomposition, output: &OutputConfig) -> Result<()> {
    let dir = output.output_dir.as_path();
    fs::create_dir_all(dir)?;
    info!("Writing results to {:?}", dir);

    write_cif(&decomposition.partial_net, dir, PARTIAL_NET_FILE)?;
    if !output.export_intermediates {
        return Ok(());
    }

    write_cif(&decomposition.nodes, dir, NODES_FILE)?;
    write_cif(&decomposition.linkers, dir, LINKERS_FILE)?;
    write_cif(&decomposition.original, dir, ORIGINAL_FILE)?;
    write_cif(&decomposition.condensed_net, dir, CONDENSED_FILE)?;

    let keys_path = dir.join(KEYS_FILE);
    write_key_report_to_path(
        &decomposition.node_keys,
        &decomposition.linker_keys,
        &keys_path,
    )
    .map_err(|e| CliError::FileWriting {
        path: keys_path.clone(),
        source: e.into(),
    })?;

    write_cif(&decomposition.net, dir, REDUCED_FILE)?;

    if decomposition.net.is_periodic() {
        let options = CgdWriteOptions {
            write_edge_centers: output.write_edge_centers,
        };
        write_structure::<CgdFile>(&decomposition.net, &options, dir, TOPOLOGY_FILE)?;
    } else {
        warn!("Input has no unit cell; skipping {}", TOPOLOGY_FILE);
    }
    Ok(())
}

fn write_cif(structure: &Structure, dir: &Path, name: &str) -> Result<PathBuf> {
    write_structure::<CifFile>(structure, &CifWriteOptions::default(), dir, name)
}

fn write_structure<W>(
    structure: &Structure,
    options: &W::Options,
    dir: &Path,
    name: &str,
) -> Result<PathBuf>
where
    W: StructureWriter,
    W::Error: Send + Sync + 'static,
{
    let path = dir.join(name);
    W::write_to_path(structure, options, &path).map_err(|e| CliError::FileWriting {
        path: path.clone(),
        source: e.into(),
    })?;
    info!(atoms = structure.atom_count(), "Wrote {:?}", &path);
    Ok(path)
}

fn print_signatures(decomposition: &Decomposition) {
    println!("Unique nodes:");
    for signature in &decomposition.node_signatures {
        println!("  {}", signature);
    }
    println!("Unique linkers:");
    for signature in &decomposition.linker_signatures {
        println!("  {}", signature);
    }
}
