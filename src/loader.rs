use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use error_stack::{Report, ResultExt};
use tracing::{debug, info};

use crate::error::DataError;
use crate::model::{RawTable, TimeFrame};

/// Directories searched for a timeframe's default file, after the
/// configured data directory.
const FALLBACK_DIRS: &[&str] = &[".", "Data", "data_files"];

/// Read a headed CSV file into a [`RawTable`]. Cells are kept as text;
/// typing happens during normalization.
pub fn read_csv(path: &Path) -> Result<RawTable, Report<DataError>> {
    info!(path = %path.display(), "reading data file");

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .change_context(DataError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .change_context(DataError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .change_context(DataError::ReadFile)
            .attach_with(|| format!("path: {}, record: {}", path.display(), line + 1))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "data file read");
    Ok(RawTable::new(headers, rows))
}

/// Locate the default data file for `timeframe`, trying `data_dir` first.
pub fn discover(data_dir: &Path, timeframe: TimeFrame) -> Result<PathBuf, Report<DataError>> {
    let file_name = timeframe.default_file_name();
    let candidates: Vec<PathBuf> = std::iter::once(data_dir)
        .chain(FALLBACK_DIRS.iter().map(Path::new))
        .map(|dir| dir.join(&file_name))
        .collect();

    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        debug!(path = %found.display(), "data file found");
        return Ok(found.clone());
    }

    let searched = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(Report::new(DataError::NotFound { searched }))
}
