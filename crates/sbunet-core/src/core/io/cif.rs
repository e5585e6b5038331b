use crate::core::chemistry::bonding::perceive_bonds;
use crate::core::chemistry::elements::{atomic_number, symbol};
use crate::core::io::traits::{StructureReader, StructureWriter};
use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::lattice::{Lattice, LatticeError};
use crate::core::models::site_index::{build_tree, points_within};
use crate::core::models::structure::Structure;
use crate::core::models::topology::{BondOrder, ImageVector};
use nalgebra::{Matrix3, Vector3};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

/// Fractional distance below which two symmetry-generated sites are merged.
const DUPLICATE_SITE_TOLERANCE: f64 = 1.0e-3;

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: CifParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Unknown element '{symbol}' on line {line}")]
    UnknownElement { line: usize, symbol: String },
    #[error("Invalid unit cell: {0}")]
    InvalidLattice(#[from] LatticeError),
}

#[derive(Debug, Error)]
pub enum CifParseErrorKind {
    #[error("Text field opened here is never closed")]
    UnterminatedTextField,
    #[error("Quoted string is never closed")]
    UnterminatedQuote,
    #[error("Tag '{tag}' has no value")]
    MissingValue { tag: String },
    #[error("Value '{0}' does not belong to any tag")]
    UnexpectedValue(String),
    #[error("Loop has {values} values for {tags} tags")]
    LoopValueCount { tags: usize, values: usize },
    #[error("Invalid number for '{tag}' (value: '{value}')")]
    InvalidNumber { tag: String, value: String },
    #[error("Invalid symmetry operation '{0}'")]
    InvalidSymmetryOperation(String),
    #[error("Invalid site symmetry code '{0}'")]
    InvalidSymmetryCode(String),
    #[error("Bond refers to unknown atom site '{0}'")]
    UnknownAtomLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CifReadOptions {
    /// Perceive bonds from covalent radii when the file carries no usable
    /// `_geom_bond` loop.
    pub perceive_bonds: bool,
}

impl Default for CifReadOptions {
    fn default() -> Self {
        Self {
            perceive_bonds: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CifWriteOptions {
    /// Emit a `_geom_bond` loop.
    pub write_bonds: bool,
}

impl Default for CifWriteOptions {
    fn default() -> Self {
        Self { write_bonds: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Data(String),
    Loop,
    Tag(String),
    Value(String),
}

#[derive(Debug, Clone)]
struct Lexeme {
    token: Token,
    line: usize,
}

fn tokenize(reader: &mut impl BufRead) -> Result<Vec<Lexeme>, CifError> {
    let mut lexemes = Vec::new();
    let mut text_field: Option<(String, usize)> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = index + 1;

        if let Some((mut buffer, start)) = text_field.take() {
            if line.starts_with(';') {
                let value = buffer.trim_end_matches('\n').to_string();
                lexemes.push(Lexeme {
                    token: Token::Value(value),
                    line: start,
                });
            } else {
                buffer.push_str(&line);
                buffer.push('\n');
                text_field = Some((buffer, start));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(';') {
            let mut buffer = rest.to_string();
            if !buffer.is_empty() {
                buffer.push('\n');
            }
            text_field = Some((buffer, line_num));
            continue;
        }

        tokenize_line(&line, line_num, &mut lexemes)?;
    }

    if let Some((_, start)) = text_field {
        return Err(CifError::Parse {
            line: start,
            kind: CifParseErrorKind::UnterminatedTextField,
        });
    }
    Ok(lexemes)
}

fn tokenize_line(line: &str, line_num: usize, lexemes: &mut Vec<Lexeme>) -> Result<(), CifError> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }

        if c == '\'' || c == '"' {
            let mut j = i + 1;
            loop {
                if j >= chars.len() {
                    return Err(CifError::Parse {
                        line: line_num,
                        kind: CifParseErrorKind::UnterminatedQuote,
                    });
                }
                if chars[j] == c && (j + 1 == chars.len() || chars[j + 1].is_whitespace()) {
                    break;
                }
                j += 1;
            }
            lexemes.push(Lexeme {
                token: Token::Value(chars[i + 1..j].iter().collect()),
                line: line_num,
            });
            i = j + 1;
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        let lower = word.to_ascii_lowercase();

        let token = if lower.starts_with("data_") {
            Token::Data(word[5..].to_string())
        } else if lower == "loop_" {
            Token::Loop
        } else if word.starts_with('_') {
            Token::Tag(lower)
        } else if lower.starts_with("save_") || lower == "global_" || lower == "stop_" {
            continue;
        } else {
            Token::Value(word)
        };
        lexemes.push(Lexeme {
            token,
            line: line_num,
        });
    }

    Ok(())
}

#[derive(Debug, Default)]
struct CifLoop {
    tags: Vec<String>,
    rows: Vec<Vec<String>>,
    line: usize,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }
}

#[derive(Debug, Default)]
struct DataBlock {
    name: String,
    items: HashMap<String, (String, usize)>,
    loops: Vec<CifLoop>,
}

impl DataBlock {
    fn find_loop(&self, tag: &str) -> Option<&CifLoop> {
        self.loops.iter().find(|l| l.column(tag).is_some())
    }

    fn number(&self, tag: &str) -> Result<Option<f64>, CifError> {
        let Some((raw, line)) = self.items.get(tag) else {
            return Ok(None);
        };
        if matches!(raw.trim(), "?" | ".") {
            return Ok(None);
        }
        parse_number(raw)
            .map(Some)
            .ok_or_else(|| CifError::Parse {
                line: *line,
                kind: CifParseErrorKind::InvalidNumber {
                    tag: tag.to_string(),
                    value: raw.clone(),
                },
            })
    }

    fn required_number(&self, tag: &str) -> Result<f64, CifError> {
        self.number(tag)?
            .ok_or_else(|| CifError::MissingRecord(tag.to_string()))
    }

    /// Values of a tag, whether it is looped or given as a single item.
    fn values(&self, tag: &str) -> Vec<(String, usize)> {
        if let Some(cif_loop) = self.find_loop(tag) {
            if let Some(col) = cif_loop.column(tag) {
                return cif_loop
                    .rows
                    .iter()
                    .map(|row| (row[col].clone(), cif_loop.line))
                    .collect();
            }
        }
        self.items.get(tag).cloned().into_iter().collect()
    }
}

fn parse_block(lexemes: Vec<Lexeme>) -> Result<DataBlock, CifError> {
    let mut block = DataBlock::default();
    let mut found_block = false;
    let mut iter = lexemes.into_iter().peekable();

    while let Some(lexeme) = iter.next() {
        match lexeme.token {
            Token::Data(name) => {
                if found_block {
                    break;
                }
                found_block = true;
                block.name = name;
            }
            _ if !found_block => continue,
            Token::Loop => {
                let mut cif_loop = CifLoop {
                    line: lexeme.line,
                    ..CifLoop::default()
                };
                while let Some(Lexeme {
                    token: Token::Tag(_),
                    ..
                }) = iter.peek()
                {
                    if let Some(Lexeme {
                        token: Token::Tag(tag),
                        ..
                    }) = iter.next()
                    {
                        cif_loop.tags.push(tag);
                    }
                }
                let mut values = Vec::new();
                while let Some(Lexeme {
                    token: Token::Value(_),
                    ..
                }) = iter.peek()
                {
                    if let Some(Lexeme {
                        token: Token::Value(value),
                        ..
                    }) = iter.next()
                    {
                        values.push(value);
                    }
                }
                if cif_loop.tags.is_empty() || values.len() % cif_loop.tags.len() != 0 {
                    return Err(CifError::Parse {
                        line: lexeme.line,
                        kind: CifParseErrorKind::LoopValueCount {
                            tags: cif_loop.tags.len(),
                            values: values.len(),
                        },
                    });
                }
                cif_loop.rows = values
                    .chunks(cif_loop.tags.len())
                    .map(|row| row.to_vec())
                    .collect();
                block.loops.push(cif_loop);
            }
            Token::Tag(tag) => match iter.next() {
                Some(Lexeme {
                    token: Token::Value(value),
                    ..
                }) => {
                    block.items.insert(tag, (value, lexeme.line));
                }
                _ => {
                    return Err(CifError::Parse {
                        line: lexeme.line,
                        kind: CifParseErrorKind::MissingValue { tag },
                    });
                }
            },
            Token::Value(value) => {
                return Err(CifError::Parse {
                    line: lexeme.line,
                    kind: CifParseErrorKind::UnexpectedValue(value),
                });
            }
        }
    }

    if !found_block {
        return Err(CifError::MissingRecord("data_ block".into()));
    }
    Ok(block)
}

/// Parses a CIF number, dropping a standard uncertainty such as `(3)`.
/// `?` and `.` are treated as absent.
fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "?" || trimmed == "." {
        return None;
    }
    let numeric = trimmed.split('(').next().unwrap_or(trimmed);
    numeric.parse().ok()
}

fn parse_fraction(text: &str) -> Option<f64> {
    match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => text.parse().ok(),
    }
}

/// A crystallographic symmetry operation acting on fractional coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperation {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl SymmetryOperation {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == Matrix3::identity() && self.translation == Vector3::zeros()
    }

    pub fn apply(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * frac + self.translation
    }

    /// Parses an operation written as in `_symmetry_equiv_pos_as_xyz`, for
    /// example `-x+1/2, y, 1/2-z`.
    pub fn parse(text: &str) -> Option<Self> {
        let components: Vec<&str> = text.split(',').collect();
        if components.len() != 3 {
            return None;
        }
        let mut op = Self {
            rotation: Matrix3::zeros(),
            translation: Vector3::zeros(),
        };
        for (row, component) in components.iter().enumerate() {
            let (coefficients, shift) = parse_component(component)?;
            for (axis, coefficient) in coefficients.iter().enumerate() {
                op.rotation[(row, axis)] = *coefficient;
            }
            op.translation[row] = shift;
        }
        Some(op)
    }
}

fn parse_component(expr: &str) -> Option<([f64; 3], f64)> {
    let expr: String = expr
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if expr.is_empty() {
        return None;
    }

    let mut terms: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in expr.chars() {
        if (c == '+' || c == '-') && !current.is_empty() {
            terms.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    terms.push(current);

    let mut coefficients = [0.0; 3];
    let mut shift = 0.0;
    for term in terms {
        let (sign, body) = match term.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, term.strip_prefix('+').unwrap_or(&term)),
        };
        let axis = match body.chars().last()? {
            'x' => Some(0),
            'y' => Some(1),
            'z' => Some(2),
            _ => None,
        };
        match axis {
            Some(axis) => {
                let factor = body[..body.len() - 1].trim_end_matches('*');
                let factor = if factor.is_empty() {
                    1.0
                } else {
                    parse_fraction(factor)?
                };
                coefficients[axis] += sign * factor;
            }
            None => shift += sign * parse_fraction(body)?,
        }
    }
    Some((coefficients, shift))
}

/// Parses a CCDC site symmetry code (`1_555`, `555` or `.`) into the
/// operation number and the lattice translation.
fn parse_symmetry_code(code: &str) -> Option<(usize, ImageVector)> {
    let code = code.trim();
    if code.is_empty() || code == "." || code == "?" {
        return Some((1, ImageVector::ZERO));
    }
    let (op, translation) = match code.split_once('_') {
        Some((op, translation)) => (op.parse().ok()?, translation),
        None => (1, code),
    };
    let digits: Vec<i32> = translation
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as i32 - 5))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [a, b, c] => Some((op, ImageVector::new(*a, *b, *c))),
        _ => None,
    }
}

fn element_from(type_symbol: Option<&str>, label: &str) -> Option<u8> {
    let candidates = [type_symbol, Some(label)];
    for text in candidates.into_iter().flatten() {
        let letters: String = text.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        if letters.is_empty() {
            continue;
        }
        if letters.len() <= 2 {
            if let Some(z) = atomic_number(&letters) {
                return Some(z);
            }
        }
        if letters.len() >= 2 {
            if let Some(z) = atomic_number(&letters[..2]) {
                return Some(z);
            }
        }
        if let Some(z) = atomic_number(&letters[..1]) {
            return Some(z);
        }
    }
    None
}

struct AsymmetricSite {
    atomic_number: u8,
    label: String,
    frac: Vector3<f64>,
}

struct PlacedSite {
    atomic_number: u8,
    label: String,
    wrapped: Vector3<f64>,
    shift: ImageVector,
}

fn read_lattice(block: &DataBlock) -> Result<Option<Lattice>, CifError> {
    if block.number("_cell_length_a")?.is_none() {
        return Ok(None);
    }
    let a = block.required_number("_cell_length_a")?;
    let b = block.required_number("_cell_length_b")?;
    let c = block.required_number("_cell_length_c")?;
    let alpha = block.number("_cell_angle_alpha")?.unwrap_or(90.0);
    let beta = block.number("_cell_angle_beta")?.unwrap_or(90.0);
    let gamma = block.number("_cell_angle_gamma")?.unwrap_or(90.0);
    Ok(Some(Lattice::from_parameters(a, b, c, alpha, beta, gamma)?))
}

fn read_symmetry(block: &DataBlock) -> Result<Vec<SymmetryOperation>, CifError> {
    let mut raw = block.values("_symmetry_equiv_pos_as_xyz");
    if raw.is_empty() {
        raw = block.values("_space_group_symop_operation_xyz");
    }
    if raw.is_empty() {
        return Ok(vec![SymmetryOperation::identity()]);
    }
    raw.into_iter()
        .map(|(text, line)| {
            SymmetryOperation::parse(&text).ok_or(CifError::Parse {
                line,
                kind: CifParseErrorKind::InvalidSymmetryOperation(text),
            })
        })
        .collect()
}

fn read_sites(block: &DataBlock, lattice: Option<&Lattice>) -> Result<Vec<AsymmetricSite>, CifError> {
    let (sites, fractional) = match block.find_loop("_atom_site_fract_x") {
        Some(found) => (found, true),
        None => match block.find_loop("_atom_site_cartn_x") {
            Some(found) => (found, false),
            None => return Err(CifError::MissingRecord("_atom_site loop".into())),
        },
    };
    if fractional && lattice.is_none() {
        return Err(CifError::MissingRecord("_cell_length_a".into()));
    }

    let prefix = if fractional {
        "_atom_site_fract_"
    } else {
        "_atom_site_cartn_"
    };
    let coordinate_columns: Vec<(String, usize)> = ["x", "y", "z"]
        .iter()
        .map(|axis| {
            let tag = format!("{prefix}{axis}");
            sites
                .column(&tag)
                .map(|col| (tag.clone(), col))
                .ok_or(CifError::MissingRecord(tag))
        })
        .collect::<Result<_, _>>()?;
    let label_col = sites.column("_atom_site_label");
    let type_col = sites.column("_atom_site_type_symbol");
    if label_col.is_none() && type_col.is_none() {
        return Err(CifError::MissingRecord("_atom_site_label".into()));
    }

    let mut parsed = Vec::with_capacity(sites.rows.len());
    for (index, row) in sites.rows.iter().enumerate() {
        let label = label_col.map_or_else(|| format!("X{}", index + 1), |c| row[c].clone());
        let type_symbol = type_col.map(|c| row[c].as_str());
        let atomic_number = element_from(type_symbol, &label).ok_or_else(|| {
            CifError::UnknownElement {
                line: sites.line,
                symbol: type_symbol.unwrap_or(&label).to_string(),
            }
        })?;

        let mut coords = Vector3::zeros();
        for (axis, (tag, col)) in coordinate_columns.iter().enumerate() {
            coords[axis] = parse_number(&row[*col]).ok_or_else(|| CifError::Parse {
                line: sites.line,
                kind: CifParseErrorKind::InvalidNumber {
                    tag: tag.clone(),
                    value: row[*col].clone(),
                },
            })?;
        }
        let frac = match (fractional, lattice) {
            (false, Some(lattice)) => {
                lattice.cartesian_to_fractional(&nalgebra::Point3::from(coords))
            }
            _ => coords,
        };

        parsed.push(AsymmetricSite {
            atomic_number,
            label,
            frac,
        });
    }
    Ok(parsed)
}

fn expand_sites(sites: &[AsymmetricSite], ops: &[SymmetryOperation]) -> Vec<PlacedSite> {
    let mut generated = Vec::with_capacity(sites.len() * ops.len());
    for site in sites {
        for op in ops {
            let (wrapped, shift) = Lattice::wrap_fractional_with_shift(&op.apply(&site.frac));
            generated.push(PlacedSite {
                atomic_number: site.atomic_number,
                label: site.label.clone(),
                wrapped,
                shift,
            });
        }
    }

    let (points, owners) = face_images(&generated);
    let Some(tree) = build_tree(&points) else {
        return generated;
    };

    // A generated site is dropped when an earlier kept site of the same
    // element lies within the tolerance, across cell faces included.
    let mut kept = vec![false; generated.len()];
    for (index, site) in generated.iter().enumerate() {
        let query = [site.wrapped.x, site.wrapped.y, site.wrapped.z];
        let duplicate = points_within(&tree, &query, DUPLICATE_SITE_TOLERANCE)
            .into_iter()
            .map(|hit| owners[hit])
            .any(|other| {
                other < index
                    && kept[other]
                    && generated[other].atomic_number == site.atomic_number
            });
        kept[index] = !duplicate;
    }

    generated
        .into_iter()
        .zip(kept)
        .filter_map(|(site, keep)| keep.then_some(site))
        .collect()
}

/// Fractional points for duplicate search: every site, plus its translated
/// copies across each cell face it lies within the tolerance of.
fn face_images(sites: &[PlacedSite]) -> (Vec<[f64; 3]>, Vec<usize>) {
    let mut points = Vec::with_capacity(sites.len());
    let mut owners = Vec::with_capacity(sites.len());
    for (index, site) in sites.iter().enumerate() {
        let offsets: [Vec<f64>; 3] = std::array::from_fn(|axis| {
            let value = site.wrapped[axis];
            let mut offsets = vec![0.0];
            if value < DUPLICATE_SITE_TOLERANCE {
                offsets.push(1.0);
            }
            if value > 1.0 - DUPLICATE_SITE_TOLERANCE {
                offsets.push(-1.0);
            }
            offsets
        });
        for da in &offsets[0] {
            for db in &offsets[1] {
                for dc in &offsets[2] {
                    points.push([
                        site.wrapped.x + da,
                        site.wrapped.y + db,
                        site.wrapped.z + dc,
                    ]);
                    owners.push(index);
                }
            }
        }
    }
    (points, owners)
}

fn read_bonds(
    block: &DataBlock,
    structure: &mut Structure,
    placed: &[PlacedSite],
    ids: &[AtomId],
) -> Result<usize, CifError> {
    let Some(bonds) = block.find_loop("_geom_bond_atom_site_label_1") else {
        return Ok(0);
    };
    let (Some(col1), Some(col2)) = (
        bonds.column("_geom_bond_atom_site_label_1"),
        bonds.column("_geom_bond_atom_site_label_2"),
    ) else {
        return Err(CifError::MissingRecord("_geom_bond_atom_site_label_2".into()));
    };
    let sym1_col = bonds.column("_geom_bond_site_symmetry_1");
    let sym2_col = bonds.column("_geom_bond_site_symmetry_2");
    let type_col = bonds.column("_ccdc_geom_bond_type");

    let mut by_label: HashMap<&str, usize> = HashMap::new();
    for (index, site) in placed.iter().enumerate() {
        by_label.entry(site.label.as_str()).or_insert(index);
    }
    let lookup = |label: &str| {
        by_label.get(label).copied().ok_or_else(|| CifError::Parse {
            line: bonds.line,
            kind: CifParseErrorKind::UnknownAtomLabel(label.to_string()),
        })
    };
    let translation = |col: Option<usize>, row: &[String]| {
        let code = col.map_or(".", |c| row[c].as_str());
        match parse_symmetry_code(code) {
            Some((1, image)) => Ok(image),
            _ => Err(CifError::Parse {
                line: bonds.line,
                kind: CifParseErrorKind::InvalidSymmetryCode(code.to_string()),
            }),
        }
    };

    let mut created = 0;
    for row in &bonds.rows {
        let i = lookup(&row[col1])?;
        let j = lookup(&row[col2])?;
        let image = (placed[j].shift + translation(sym2_col, row.as_slice())?)
            - (placed[i].shift + translation(sym1_col, row.as_slice())?);
        let order = type_col
            .and_then(|c| row[c].parse::<BondOrder>().ok())
            .unwrap_or_default();
        if structure
            .add_bond(ids[i], ids[j], order, image)
            .is_some_and(|insertion| insertion.is_new())
        {
            created += 1;
        }
    }
    Ok(created)
}

/// Reader and writer for Crystallographic Information Files.
pub struct CifFile;

impl StructureReader for CifFile {
    type Options = CifReadOptions;
    type Error = CifError;

    fn read_from(
        reader: &mut impl BufRead,
        options: &Self::Options,
    ) -> Result<Structure, Self::Error> {
        let block = parse_block(tokenize(reader)?)?;
        let lattice = read_lattice(&block)?;
        let ops = read_symmetry(&block)?;
        let sites = read_sites(&block, lattice.as_ref())?;
        if sites.is_empty() {
            return Err(CifError::MissingRecord("atom sites".into()));
        }

        let placed = match lattice {
            Some(_) => expand_sites(&sites, &ops),
            None => sites
                .iter()
                .map(|s| PlacedSite {
                    atomic_number: s.atomic_number,
                    label: s.label.clone(),
                    wrapped: s.frac,
                    shift: ImageVector::ZERO,
                })
                .collect(),
        };

        let mut structure = match lattice.clone() {
            Some(lattice) => Structure::with_lattice(lattice),
            None => Structure::new(),
        };
        structure.set_title(block.name.clone());

        let is_p1 = ops.len() == 1 && ops[0].is_identity();
        let has_bond_loop = block.find_loop("_geom_bond_atom_site_label_1").is_some();

        structure.begin_modify();
        let ids: Vec<AtomId> = placed
            .iter()
            .map(|site| {
                let position = match &lattice {
                    Some(lattice) => lattice.fractional_to_cartesian(&site.wrapped),
                    None => nalgebra::Point3::from(site.wrapped),
                };
                structure.add_atom(Atom::new(site.atomic_number, position).with_label(&site.label))
            })
            .collect();

        let bonded = if has_bond_loop && is_p1 {
            read_bonds(&block, &mut structure, &placed, &ids)
        } else {
            Ok(0)
        };
        structure.end_modify();
        let bonded = bonded?;

        if !(has_bond_loop && is_p1) && options.perceive_bonds {
            if has_bond_loop {
                debug!("Ignoring _geom_bond loop of a non-P1 structure");
            }
            perceive_bonds(&mut structure);
        }

        debug!(
            atoms = structure.atom_count(),
            bonds = structure.bond_count(),
            from_file = bonded,
            operations = ops.len(),
            "Read CIF data block '{}'",
            block.name
        );
        Ok(structure)
    }
}

fn site_symmetry_code(image: &ImageVector) -> String {
    if image.is_zero() {
        ".".to_string()
    } else {
        let [a, b, c] = image.0;
        format!("1_{}{}{}", a + 5, b + 5, c + 5)
    }
}

impl StructureWriter for CifFile {
    type Options = CifWriteOptions;
    type Error = CifError;

    fn write_to(
        structure: &Structure,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let title = if structure.title().is_empty() {
            "sbunet"
        } else {
            structure.title()
        };
        writeln!(writer, "data_{}", title.replace(char::is_whitespace, "_"))?;
        writeln!(writer, "_audit_creation_method 'sbunet'")?;

        if let Some(lattice) = structure.lattice() {
            writeln!(writer, "_symmetry_space_group_name_H-M 'P 1'")?;
            writeln!(writer, "_symmetry_Int_Tables_number 1")?;
            writeln!(writer, "loop_")?;
            writeln!(writer, "_symmetry_equiv_pos_as_xyz")?;
            writeln!(writer, "  x,y,z")?;
            let [a, b, c, alpha, beta, gamma] = lattice.parameters();
            writeln!(writer, "_cell_length_a {a:.4}")?;
            writeln!(writer, "_cell_length_b {b:.4}")?;
            writeln!(writer, "_cell_length_c {c:.4}")?;
            writeln!(writer, "_cell_angle_alpha {alpha:.4}")?;
            writeln!(writer, "_cell_angle_beta {beta:.4}")?;
            writeln!(writer, "_cell_angle_gamma {gamma:.4}")?;
        }

        writeln!(writer, "loop_")?;
        writeln!(writer, "_atom_site_label")?;
        writeln!(writer, "_atom_site_type_symbol")?;
        let prefix = if structure.is_periodic() {
            "_atom_site_fract"
        } else {
            "_atom_site_Cartn"
        };
        writeln!(writer, "{prefix}_x")?;
        writeln!(writer, "{prefix}_y")?;
        writeln!(writer, "{prefix}_z")?;
        writeln!(writer, "_atom_site_occupancy")?;

        let mut labels: HashMap<AtomId, String> = HashMap::with_capacity(structure.atom_count());
        for (index, (id, atom)) in structure.atoms_iter().enumerate() {
            let element = symbol(atom.atomic_number);
            let label = format!("{element}{}", index + 1);
            let coords = match structure.lattice() {
                Some(lattice) => lattice.cartesian_to_fractional(&atom.position),
                None => atom.position.coords,
            };
            writeln!(
                writer,
                "  {:<8} {:<3} {:>10.5} {:>10.5} {:>10.5} 1.000",
                label, element, coords.x, coords.y, coords.z
            )?;
            labels.insert(id, label);
        }

        if options.write_bonds && structure.bond_count() > 0 {
            writeln!(writer, "loop_")?;
            writeln!(writer, "_geom_bond_atom_site_label_1")?;
            writeln!(writer, "_geom_bond_atom_site_label_2")?;
            writeln!(writer, "_geom_bond_distance")?;
            writeln!(writer, "_geom_bond_site_symmetry_2")?;
            writeln!(writer, "_ccdc_geom_bond_type")?;
            for (_, bond) in structure.bonds_iter() {
                let (Some(begin), Some(end)) = (structure.atom(bond.begin), structure.atom(bond.end))
                else {
                    return Err(CifError::Inconsistency(
                        "Bond refers to a removed atom".into(),
                    ));
                };
                let mut end_position = end.position;
                if let Some(lattice) = structure.lattice() {
                    end_position += lattice.translation(&bond.image);
                }
                writeln!(
                    writer,
                    "  {:<8} {:<8} {:>8.3} {:<7} {}",
                    labels[&bond.begin],
                    labels[&bond.end],
                    (end_position - begin.position).norm(),
                    site_symmetry_code(&bond.image),
                    bond.order.cif_code()
                )?;
            }
        }

        writeln!(writer)?;
        Ok(())
    }
}
