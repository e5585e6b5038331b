use thiserror::Error;

/// Element used for connector atoms: tellurium, rarely present in frameworks.
pub const DEFAULT_CONNECTOR_ELEMENT: u8 = 52;
/// Largest angle, in degrees, between two linker-connector bonds that still
/// counts as one redundant connection. Oxalate, the tightest common case, sits
/// below 85 degrees.
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 89.0;
/// Zr, Zn, Ga, Og, Ts.
pub const DEFAULT_NODE_LABELS: [u8; 5] = [40, 30, 31, 118, 117];
/// O, N, C, B.
pub const DEFAULT_LINKER_LABELS: [u8; 4] = [8, 7, 6, 5];

const MAX_ATOMIC_NUMBER: u8 = 118;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Angle tolerance must lie in (0, 180] degrees (got {0})")]
    InvalidAngleTolerance(f64),
    #[error("The {0} label pool must not be empty")]
    EmptyLabelPool(&'static str),
    #[error("Invalid element {value} in the {field} (expected 1..=118)")]
    InvalidElement { field: &'static str, value: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReductionConfig {
    /// Insert a connector atom per external connection when collapsing
    /// building units, and run the connector-specific reduction rules.
    pub connector_mode: bool,
    pub connector_element: u8,
    pub angle_tolerance_degrees: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelConfig {
    pub node_label_pool: Vec<u8>,
    pub linker_label_pool: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecomposeConfig {
    pub reduction: ReductionConfig,
    pub labels: LabelConfig,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            reduction: ReductionConfig {
                connector_mode: false,
                connector_element: DEFAULT_CONNECTOR_ELEMENT,
                angle_tolerance_degrees: DEFAULT_ANGLE_TOLERANCE,
            },
            labels: LabelConfig {
                node_label_pool: DEFAULT_NODE_LABELS.to_vec(),
                linker_label_pool: DEFAULT_LINKER_LABELS.to_vec(),
            },
        }
    }
}

#[derive(Default)]
pub struct DecomposeConfigBuilder {
    connector_mode: Option<bool>,
    connector_element: Option<u8>,
    angle_tolerance_degrees: Option<f64>,
    node_label_pool: Option<Vec<u8>>,
    linker_label_pool: Option<Vec<u8>>,
}

impl DecomposeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector_mode(mut self, enabled: bool) -> Self {
        self.connector_mode = Some(enabled);
        self
    }
    pub fn connector_element(mut self, element: u8) -> Self {
        self.connector_element = Some(element);
        self
    }
    pub fn angle_tolerance_degrees(mut self, degrees: f64) -> Self {
        self.angle_tolerance_degrees = Some(degrees);
        self
    }
    pub fn node_label_pool(mut self, pool: Vec<u8>) -> Self {
        self.node_label_pool = Some(pool);
        self
    }
    pub fn linker_label_pool(mut self, pool: Vec<u8>) -> Self {
        self.linker_label_pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<DecomposeConfig, ConfigError> {
        let defaults = DecomposeConfig::default();

        let reduction = ReductionConfig {
            connector_mode: self
                .connector_mode
                .unwrap_or(defaults.reduction.connector_mode),
            connector_element: self
                .connector_element
                .unwrap_or(defaults.reduction.connector_element),
            angle_tolerance_degrees: self
                .angle_tolerance_degrees
                .unwrap_or(defaults.reduction.angle_tolerance_degrees),
        };
        let labels = LabelConfig {
            node_label_pool: self
                .node_label_pool
                .unwrap_or(defaults.labels.node_label_pool),
            linker_label_pool: self
                .linker_label_pool
                .unwrap_or(defaults.labels.linker_label_pool),
        };

        let tolerance = reduction.angle_tolerance_degrees;
        if !(tolerance > 0.0 && tolerance <= 180.0) {
            return Err(ConfigError::InvalidAngleTolerance(tolerance));
        }
        validate_element("connector element", reduction.connector_element)?;
        validate_pool("node", "node label pool", &labels.node_label_pool)?;
        validate_pool("linker", "linker label pool", &labels.linker_label_pool)?;

        Ok(DecomposeConfig { reduction, labels })
    }
}

fn validate_element(field: &'static str, value: u8) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_ATOMIC_NUMBER {
        return Err(ConfigError::InvalidElement { field, value });
    }
    Ok(())
}

fn validate_pool(
    name: &'static str,
    field: &'static str,
    pool: &[u8],
) -> Result<(), ConfigError> {
    if pool.is_empty() {
        return Err(ConfigError::EmptyLabelPool(name));
    }
    pool.iter().try_for_each(|&z| validate_element(field, z))
}
