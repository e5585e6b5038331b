use clap::Parser;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "SBUNET - Decomposes a metal-organic framework into its building units and reduces it to a topological net.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    /// Path to the input crystal structure (CIF).
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory receiving the output files. Overrides `output.output-dir`.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Collapse linkers with connector atoms and apply the connector passes
    /// during net reduction.
    #[arg(long)]
    pub connectors: bool,

    /// Override the angle below which two connectors of a linker are
    /// considered redundant, in degrees.
    #[arg(long, value_name = "DEGREES")]
    pub angle_tolerance: Option<f64>,

    /// Write only the partially condensed structure and skip the other
    /// intermediate files.
    #[arg(long)]
    pub no_intermediates: bool,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn positional_input_is_parsed() {
        let cli = Cli::try_parse_from(["sbunet", "frameworks/MOF-5.cif"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("frameworks/MOF-5.cif"));
        assert!(cli.output_dir.is_none());
        assert!(!cli.connectors);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn overrides_are_collected() {
        let cli = Cli::try_parse_from([
            "sbunet",
            "in.cif",
            "-o",
            "out",
            "--connectors",
            "--angle-tolerance",
            "45",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(cli.connectors);
        assert_eq!(cli.angle_tolerance, Some(45.0));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["sbunet"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["sbunet", "in.cif", "-q", "-v"]).is_err());
    }
}
