//! Relaxed CSV reader for CMS exports.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::domain::EntityKind;
use crate::domain::ports::RosterSourceError;
use crate::domain::source_rows::{NormaliseOptions, RawRow, SourceBatch, normalise_rows};
use crate::domain::sync_run::RowError;

/// Reads one export file into a [`SourceBatch`].
///
/// Ragged rows are accepted and blank lines skipped; rows the `csv` crate
/// cannot decode are reported as malformed instead of failing the file.
#[derive(Debug, Clone, Default)]
pub struct CsvExportReader {
    options: NormaliseOptions,
}

impl CsvExportReader {
    pub fn new(options: NormaliseOptions) -> Self {
        Self { options }
    }

    /// Read `path` for `kind`.
    ///
    /// # Errors
    ///
    /// [`RosterSourceError::Unavailable`] when the file cannot be opened and
    /// [`RosterSourceError::Decode`] when its header row is unreadable.
    pub fn read(&self, kind: EntityKind, path: &Path) -> Result<SourceBatch, RosterSourceError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(|error| {
                RosterSourceError::unavailable(format!("{}: {error}", path.display()))
            })?;
        let headers = reader
            .headers()
            .map_err(|error| {
                RosterSourceError::decode(format!("{}: unreadable header: {error}", path.display()))
            })?
            .clone();

        let mut rows = Vec::new();
        let mut undecodable = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let position = index + 1;
            match record {
                Ok(record) if is_blank(&record) => {}
                Ok(record) => rows.push(to_raw_row(position, &headers, &record)),
                Err(error) => undecodable.push(RowError::malformed(
                    None,
                    format!("row {position}: {error}"),
                )),
            }
        }
        debug!(%kind, path = %path.display(), rows = rows.len(), "read CSV export");

        let mut batch = normalise_rows(kind, rows, &self.options);
        batch.rejected.extend(undecodable);
        Ok(batch)
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

/// Short rows keep every header column, padded with empty cells; cells past
/// the header are dropped.
fn to_raw_row(position: usize, headers: &StringRecord, record: &StringRecord) -> RawRow {
    let cells = record.iter().chain(std::iter::repeat(""));
    RawRow {
        position,
        fields: headers
            .iter()
            .zip(cells)
            .map(|(column, value)| (column.to_owned(), value.to_owned()))
            .collect(),
    }
}
