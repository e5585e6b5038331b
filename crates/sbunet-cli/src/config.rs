use crate::cli::Cli;
use crate::error::{CliError, Result};
use sbunet::core::chemistry::elements;
use sbunet::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_OUTPUT_DIR: &str = "Test";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialReductionConfig {
    connector_mode: Option<bool>,
    connector_element: Option<String>,
    angle_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialLabelConfig {
    nodes: Option<Vec<String>>,
    linkers: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    output_dir: Option<PathBuf>,
    export_intermediates: Option<bool>,
    write_edge_centers: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialDecomposeConfig {
    reduction: Option<PartialReductionConfig>,
    labels: Option<PartialLabelConfig>,
    output: Option<PartialOutputConfig>,
}

/// Settings that only concern what the CLI writes to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub export_intermediates: bool,
    pub write_edge_centers: bool,
}

pub struct AppConfig {
    pub input_path: PathBuf,
    pub output: OutputConfig,
    pub core_config: core_config::DecomposeConfig,
}

impl PartialDecomposeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the file named by `--config`, or starts from an empty
    /// configuration when none is given.
    pub fn load(args: &Cli) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(self, args: &Cli) -> Result<AppConfig> {
        let reduction = self.reduction.unwrap_or_default();
        let labels = self.labels.unwrap_or_default();
        let output = self.output.unwrap_or_default();

        let mut builder = core_config::DecomposeConfigBuilder::new()
            .connector_mode(args.connectors || reduction.connector_mode.unwrap_or(false));

        if let Some(symbol) = reduction.connector_element.as_deref() {
            builder = builder.connector_element(resolve_element("connector-element", symbol)?);
        }
        if let Some(degrees) = args.angle_tolerance.or(reduction.angle_tolerance) {
            builder = builder.angle_tolerance_degrees(degrees);
        }
        if let Some(symbols) = labels.nodes.as_deref() {
            builder = builder.node_label_pool(resolve_pool("labels.nodes", symbols)?);
        }
        if let Some(symbols) = labels.linkers.as_deref() {
            builder = builder.linker_label_pool(resolve_pool("labels.linkers", symbols)?);
        }

        let core_config = builder.build()?;

        let output = OutputConfig {
            output_dir: args
                .output_dir
                .clone()
                .or(output.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            export_intermediates: !args.no_intermediates
                && output.export_intermediates.unwrap_or(true),
            write_edge_centers: output.write_edge_centers.unwrap_or(true),
        };

        Ok(AppConfig {
            input_path: args.input.clone(),
            output,
            core_config,
        })
    }
}

fn resolve_element(field: &str, symbol: &str) -> Result<u8> {
    elements::atomic_number(symbol).ok_or_else(|| {
        CliError::Config(format!("Unknown element symbol '{}' in `{}`", symbol, field))
    })
}

fn resolve_pool(field: &str, symbols: &[String]) -> Result<Vec<u8>> {
    symbols
        .iter()
        .map(|symbol| resolve_element(field, symbol))
        .collect()
}
