//! Reading and writing the pull-request report file.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::ReportError;
use crate::models::PrReport;

/// Load a report written by the collector.
pub fn load(path: &Path) -> Result<PrReport, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let report: PrReport =
        serde_json::from_str(&content).map_err(|e| ReportError::ParseError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
    info!(
        path = %path.display(),
        open = report.open_prs.len(),
        closed = report.closed_prs.len(),
        "loaded report"
    );
    Ok(report)
}

/// Write `report` as 2-space indented JSON.
///
/// The file is written next to its destination and renamed into place, so a
/// reader never sees a partial report.
pub fn save(report: &PrReport, path: &Path) -> Result<(), ReportError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut json = serde_json::to_vec_pretty(report)?;
    json.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ReportError::PersistFailed {
        path: path.display().to_string(),
        detail: e.error.to_string(),
    })?;

    debug!(bytes = json.len(), "report bytes written");
    info!(path = %path.display(), changes = report.len(), "saved report");
    Ok(())
}
