use crate::core::chemistry::elements::symbol;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes the human-readable legend mapping each pseudo-atom element back to
/// the fragment signature it stands for.
///
/// Node keys are listed before linker keys, each group in signature order.
pub fn write_key_report(
    node_keys: &BTreeMap<String, u8>,
    linker_keys: &BTreeMap<String, u8>,
    writer: &mut impl Write,
) -> io::Result<()> {
    writeln!(writer, "Fragment identities for condensed_linkers.cif")?;
    writeln!(writer)?;
    write_section(writer, "Nodes", node_keys)?;
    writeln!(writer)?;
    write_section(writer, "Linkers", linker_keys)?;
    Ok(())
}

/// Writes the key report to a file, creating or truncating it.
pub fn write_key_report_to_path<P: AsRef<Path>>(
    node_keys: &BTreeMap<String, u8>,
    linker_keys: &BTreeMap<String, u8>,
    path: P,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_key_report(node_keys, linker_keys, &mut writer)?;
    writer.flush()
}

fn write_section(
    writer: &mut impl Write,
    heading: &str,
    keys: &BTreeMap<String, u8>,
) -> io::Result<()> {
    writeln!(writer, "{heading}")?;
    writeln!(writer, "================")?;
    for (signature, &element) in keys {
        writeln!(writer, "{}: {}", symbol(element), signature)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_nodes_then_linkers_in_signature_order() {
        let nodes = BTreeMap::from([("[Zn]".to_string(), 40u8)]);
        let linkers = BTreeMap::from([
            ("[O][C]([O])[C]".to_string(), 7u8),
            ("[C]1[C][C][C][C][C]1".to_string(), 8u8),
        ]);

        let mut buffer = Vec::new();
        write_key_report(&nodes, &linkers, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "Fragment identities for condensed_linkers.cif\n\
             \n\
             Nodes\n\
             ================\n\
             Zr: [Zn]\n\
             \n\
             Linkers\n\
             ================\n\
             O: [C]1[C][C][C][C][C]1\n\
             N: [O][C]([O])[C]\n"
        );
    }

    #[test]
    fn empty_sections_keep_their_headings() {
        let mut buffer = Vec::new();
        write_key_report(&BTreeMap::new(), &BTreeMap::new(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().filter(|l| *l == "================").count(), 2);
    }

    #[test]
    fn report_can_be_written_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        let nodes = BTreeMap::from([("[Cu]".to_string(), 30u8)]);

        write_key_report_to_path(&nodes, &BTreeMap::new(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Zn: [Cu]"));
    }
}
