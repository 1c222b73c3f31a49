//! Reference Data Loading
//!
//! Builds the three static lookup structures the pipeline matches against:
//! - Trait reference (`data_ref.csv`): species label + numeric trait columns
//! - Ecology descriptions (`data_ecologie_espece.csv`): species → free text
//! - Syntaxons (`data_villaret.csv`): community types with their species sets
//!
//! All three are semicolon-delimited. The trait reference is required; the
//! other two degrade to empty structures when missing or unreadable.

use crate::error::AnalysisError;
use crate::utils::{normalize_species_name, SpeciesKey};
use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Legacy trait column name still present in older reference exports
pub const LEGACY_TRAIT_COLUMN: &str = "CC Rhoméo";

/// Canonical name the legacy column is renamed to at load time
pub const CANONICAL_TRAIT_COLUMN: &str = "Perturbation CC";

pub const TRAITS_FILE: &str = "data_ref.csv";
pub const ECOLOGY_FILE: &str = "data_ecologie_espece.csv";
pub const SYNTAXONS_FILE: &str = "data_villaret.csv";

/// Locations of the three reference tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePaths {
    pub traits: PathBuf,
    pub ecology: PathBuf,
    pub syntaxons: PathBuf,
}

impl ReferencePaths {
    /// Standard file names inside a data directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            traits: dir.join(TRAITS_FILE),
            ecology: dir.join(ECOLOGY_FILE),
            syntaxons: dir.join(SYNTAXONS_FILE),
        }
    }
}

// ============================================================================
// Trait reference
// ============================================================================

/// One row of the trait reference
#[derive(Debug, Clone, PartialEq)]
pub struct TraitRecord {
    /// Species label exactly as written in the reference ("Espece" column)
    pub label: String,
    pub key: Option<SpeciesKey>,
    /// One value per trait column, `None` when missing or non-numeric
    pub values: Vec<Option<f64>>,
}

/// Trait reference table with a first-match-wins key index
#[derive(Debug, Clone, Default)]
pub struct TraitTable {
    species_column: String,
    trait_names: Vec<String>,
    records: Vec<TraitRecord>,
    by_key: FxHashMap<SpeciesKey, usize>,
}

impl TraitTable {
    /// Build from already-parsed records
    ///
    /// Records whose key repeats an earlier one stay in the table but are
    /// never returned by [`TraitTable::lookup`].
    pub fn new(species_column: impl Into<String>, trait_names: Vec<String>, records: Vec<TraitRecord>) -> Self {
        let trait_names = trait_names
            .into_iter()
            .map(|name| {
                if name == LEGACY_TRAIT_COLUMN {
                    CANONICAL_TRAIT_COLUMN.to_string()
                } else {
                    name
                }
            })
            .collect();

        let mut by_key = FxHashMap::default();
        for (idx, record) in records.iter().enumerate() {
            if let Some(key) = &record.key {
                by_key.entry(key.clone()).or_insert(idx);
            }
        }

        Self {
            species_column: species_column.into(),
            trait_names,
            records,
            by_key,
        }
    }

    /// Load the trait reference from disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read trait reference: {:?}", path))?;
        Self::from_csv_bytes(bytes)
            .with_context(|| format!("Failed to parse trait reference: {:?}", path))
    }

    /// Parse a semicolon-delimited trait table (header row required)
    ///
    /// Trait cells are trimmed and parsed as numbers; anything else becomes
    /// missing instead of failing the load.
    pub fn from_csv_bytes(bytes: Vec<u8>) -> Result<Self> {
        let df = read_semicolon_table(bytes, true).context("Trait reference is not a valid table")?;

        let column_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let (species_column, trait_columns) = column_names
            .split_first()
            .ok_or_else(|| anyhow!("Trait reference has no columns"))?;

        let species = df
            .column(species_column)
            .with_context(|| format!("Column '{}' not found", species_column))?
            .str()
            .with_context(|| format!("Column '{}' is not string type", species_column))?;

        let mut trait_values: Vec<Vec<Option<f64>>> = Vec::with_capacity(trait_columns.len());
        for name in trait_columns {
            let cells = df
                .column(name)
                .with_context(|| format!("Column '{}' not found", name))?
                .str()
                .with_context(|| format!("Column '{}' is not string type", name))?;
            trait_values.push(cells.into_iter().map(parse_numeric_cell).collect());
        }

        let records = (0..df.height())
            .map(|idx| {
                let label = species.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();
                TraitRecord {
                    key: normalize_species_name(&label),
                    label,
                    values: trait_values.iter().map(|column| column[idx]).collect(),
                }
            })
            .collect();

        Ok(Self::new(species_column.clone(), trait_columns.to_vec(), records))
    }

    /// Name of the species label column (first column of the reference)
    pub fn species_column(&self) -> &str {
        &self.species_column
    }

    pub fn trait_names(&self) -> &[String] {
        &self.trait_names
    }

    pub fn record(&self, idx: usize) -> &TraitRecord {
        &self.records[idx]
    }

    /// Index of the earliest record with this key
    pub fn lookup(&self, key: &SpeciesKey) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_numeric_cell(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

// ============================================================================
// Ecology descriptions
// ============================================================================

/// Species key → ecology description (first occurrence wins)
#[derive(Debug, Clone, Default)]
pub struct EcologyIndex {
    descriptions: FxHashMap<SpeciesKey, Option<String>>,
}

impl EcologyIndex {
    /// Build from (label, description) rows; blank labels are dropped
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut descriptions = FxHashMap::default();
        for (label, description) in rows {
            if let Some(key) = normalize_species_name(label) {
                descriptions
                    .entry(key)
                    .or_insert_with(|| description.map(|d| d.to_string()));
            }
        }
        Self { descriptions }
    }

    /// Load descriptions, degrading to an empty index on any failure
    pub fn load(path: &Path) -> Self {
        let loaded = std::fs::read(path)
            .with_context(|| format!("Failed to read ecology descriptions: {:?}", path))
            .and_then(|bytes| Self::from_csv_bytes(&bytes));

        match loaded {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Ecology descriptions unavailable, continuing without: {:#}", e);
                Self::default()
            }
        }
    }

    /// Parse a headerless two-column table (species; description)
    ///
    /// Every row is read independently: a row without a description cell
    /// gets `None` and never changes how later rows are read.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let rows = read_ragged_rows(bytes).context("Ecology table is not a valid table")?;

        Ok(Self::from_rows(rows.iter().filter_map(|cells| {
            let label = cells.first()?;
            Some((label.as_str(), cells.get(1).map(String::as_str)))
        })))
    }

    /// Description for a species, if one exists and is not blank
    pub fn description(&self, key: &SpeciesKey) -> Option<&str> {
        self.descriptions
            .get(key)
            .and_then(|d| d.as_deref())
            .filter(|d| !d.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

// ============================================================================
// Syntaxons
// ============================================================================

/// Reference plant-community type with its characteristic species
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntaxon {
    pub id: String,
    pub name_latin: String,
    pub species: BTreeSet<SpeciesKey>,
}

/// Load syntaxons, degrading to an empty list on any failure
pub fn load_syntaxons(path: &Path) -> Vec<Syntaxon> {
    let loaded = std::fs::read(path)
        .with_context(|| format!("Failed to read syntaxon table: {:?}", path))
        .and_then(|bytes| parse_syntaxons(&bytes));

    match loaded {
        Ok(syntaxons) => syntaxons,
        Err(e) => {
            tracing::warn!("Syntaxon table unavailable, continuing without: {:#}", e);
            Vec::new()
        }
    }
}

/// Parse the headerless syntaxon table
///
/// Each record: `id;name;species;species;...`, with a varying number of
/// species per row. Records with fewer than two cells are skipped.
pub fn parse_syntaxons(bytes: &[u8]) -> Result<Vec<Syntaxon>> {
    let rows = read_ragged_rows(bytes).context("Syntaxon table is not a valid table")?;

    Ok(rows
        .into_iter()
        .filter(|cells| cells.len() >= 2)
        .map(|cells| Syntaxon {
            id: cells[0].trim().to_string(),
            name_latin: cells[1].trim().to_string(),
            species: cells[2..]
                .iter()
                .filter_map(|cell| normalize_species_name(cell))
                .collect(),
        })
        .collect())
}

// ============================================================================
// Combined index
// ============================================================================

/// Immutable snapshot of all reference data used by one analysis
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    pub traits: TraitTable,
    pub ecology: EcologyIndex,
    pub syntaxons: Vec<Syntaxon>,
}

impl ReferenceIndex {
    pub fn new(traits: TraitTable, ecology: EcologyIndex, syntaxons: Vec<Syntaxon>) -> Self {
        Self { traits, ecology, syntaxons }
    }

    /// Load all three tables; only the trait reference is required
    pub fn load(paths: &ReferencePaths) -> Result<Self, AnalysisError> {
        let traits = TraitTable::load(&paths.traits).map_err(AnalysisError::ReferenceLoad)?;
        let ecology = EcologyIndex::load(&paths.ecology);
        let syntaxons = load_syntaxons(&paths.syntaxons);

        tracing::info!(
            "Loaded reference data: {} trait records ({} traits), {} ecology descriptions, {} syntaxons",
            traits.len(),
            traits.trait_names().len(),
            ecology.len(),
            syntaxons.len()
        );

        Ok(Self::new(traits, ecology, syntaxons))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// Read a headerless semicolon-delimited file whose rows differ in length
///
/// Quoted cells may contain separators and line breaks. Invalid UTF-8 is
/// replaced rather than rejected.
fn read_ragged_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(strip_bom(bytes));

    reader
        .byte_records()
        .map(|record| -> Result<Vec<String>> {
            let record = record.context("Malformed delimited record")?;
            Ok(record
                .iter()
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect())
        })
        .collect()
}

/// Read a semicolon-delimited table with every column as string
fn read_semicolon_table(bytes: Vec<u8>, has_header: bool) -> PolarsResult<DataFrame> {
    let bytes = strip_bom(&bytes).to_vec();

    CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(b';')
                .with_truncate_ragged_lines(true)
                .with_encoding(CsvEncoding::LossyUtf8)
        })
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}
