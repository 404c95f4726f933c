use crate::core::config::OutputConfig;
use crate::core::rates::{RatePoint, RateTable};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const HEADER: [&str; 3] = ["currency", "effectiveDate", "mid"];

/// The two CSV files rates are persisted to: a full dump and a user-selected subset.
///
/// Both files are replaced wholesale on every save.
#[derive(Debug, Clone)]
pub struct Archive {
    all_path: PathBuf,
    selected_path: PathBuf,
}

impl Archive {
    pub fn new(all_path: impl Into<PathBuf>, selected_path: impl Into<PathBuf>) -> Self {
        Self {
            all_path: all_path.into(),
            selected_path: selected_path.into(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(&output.all, &output.selected)
    }

    pub fn all_path(&self) -> &Path {
        &self.all_path
    }

    pub fn selected_path(&self) -> &Path {
        &self.selected_path
    }

    /// Writes every pair of `table` to the full dump. Returns the number of rows written.
    pub fn save_all(&self, table: &RateTable) -> Result<usize> {
        let rows = write_records(&self.all_path, table.points())?;
        debug!(rows, path = %self.all_path.display(), "Saved all rates");
        Ok(rows)
    }

    /// Reads the full dump back.
    pub fn read_all(&self) -> Result<Vec<RatePoint>> {
        let mut reader = csv::Reader::from_path(&self.all_path)
            .with_context(|| format!("Failed to open {}", self.all_path.display()))?;

        reader
            .deserialize()
            .collect::<Result<Vec<RatePoint>, _>>()
            .with_context(|| format!("Failed to parse {}", self.all_path.display()))
    }

    /// Copies the rows of the full dump whose pair is in `pairs` to the selected file.
    ///
    /// Works from the file, not the in-memory table, so it reflects the last
    /// successful `save_all`. Returns the number of rows written.
    pub fn save_selected(&self, pairs: &[String]) -> Result<usize> {
        let rows = self.read_all()?;
        let selected = rows
            .iter()
            .filter(|point| pairs.iter().any(|pair| *pair == point.currency));

        let written = write_records(&self.selected_path, selected)?;
        debug!(written, ?pairs, path = %self.selected_path.display(), "Saved selected rates");
        Ok(written)
    }
}

/// Writes the header and `records` to a temp file beside `path`, then renames it over `path`.
///
/// On any failure the temp file is removed and `path` is left as it was.
fn write_records<T: Serialize>(path: &Path, records: impl IntoIterator<Item = T>) -> Result<usize> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(tmp);

    writer.write_record(HEADER)?;
    let mut count = 0;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        count += 1;
    }
    let tmp = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush {}: {}", path.display(), e.error()))?;

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(count)
}
