//! RON catalog validation.
//!
//! Parses a building or pet catalog and lists every invariant it breaks.
//! A catalog that parses but has problems is still reported, not an error.

use std::fs;
use std::path::Path;

use idle_core::pet::PetCatalog;
use idle_core::territory::BuildingCatalog;
use serde::{Deserialize, Serialize};

use crate::error::{HeadlessError, Result};

/// Which catalog a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Building types.
    Buildings,
    /// Pet templates.
    Pets,
}

/// Validation result for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// File checked.
    pub path: String,
    /// Catalog type.
    pub kind: CatalogKind,
    /// Entries parsed.
    pub entries: usize,
    /// Broken invariants, empty when the catalog is usable.
    pub problems: Vec<String>,
}

impl ValidationReport {
    /// Whether the catalog has no problems.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Validate catalog source text.
pub fn validate_source(kind: CatalogKind, path: &Path, source: &str) -> Result<ValidationReport> {
    let parse_error = |e: ron::error::SpannedError| HeadlessError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let (entries, problems) = match kind {
        CatalogKind::Buildings => {
            let catalog: BuildingCatalog = ron::from_str(source).map_err(parse_error)?;
            (catalog.iter().count(), catalog.validate())
        }
        CatalogKind::Pets => {
            let catalog: PetCatalog = ron::from_str(source).map_err(parse_error)?;
            (catalog.iter().count(), catalog.validate())
        }
    };

    for problem in &problems {
        tracing::warn!(path = %path.display(), problem = %problem, "Catalog problem");
    }

    Ok(ValidationReport {
        path: path.display().to_string(),
        kind,
        entries,
        problems,
    })
}

/// Read and validate a catalog file.
pub fn validate_file(kind: CatalogKind, path: &Path) -> Result<ValidationReport> {
    if !path.exists() {
        return Err(HeadlessError::FileNotFound(path.to_path_buf()));
    }
    let source = fs::read_to_string(path).map_err(|e| HeadlessError::io(path, e))?;
    validate_source(kind, path, &source)
}
