//! CSV table with a fixed header row.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::{calc::FlatRecord, types::COLUMNS};

use super::{PersistError, PersistResult, TableIo};

/// [`TableIo`] over comma-separated files.
///
/// Writes go to a sibling temp file that is renamed over the destination,
/// so an interrupted save leaves the previous table intact.
#[derive(Debug, Clone, Default)]
pub struct CsvTable;

impl CsvTable {
    pub fn new() -> Self {
        Self
    }
}

impl TableIo for CsvTable {
    fn write_table(&self, rows: &[FlatRecord], destination: &Path) -> PersistResult<()> {
        if let Some(dir) = destination.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| PersistError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let tmp = destination.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new().from_path(&tmp)?;
            writer.write_record(COLUMNS)?;
            for row in rows {
                writer.write_record(COLUMNS.iter().map(|col| row.get(col).unwrap_or("")))?;
            }
            writer.flush().map_err(|source| PersistError::Io {
                path: tmp.clone(),
                source,
            })?;
        }

        fs::rename(&tmp, destination).map_err(|source| PersistError::Io {
            path: destination.to_path_buf(),
            source,
        })
    }

    fn read_table(&self, source: &Path) -> PersistResult<Vec<FlatRecord>> {
        let file = match File::open(source) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(PersistError::Io {
                    path: source.to_path_buf(),
                    source: err,
                });
            }
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::Headers)
            .from_reader(file);
        let headers = reader.headers()?.clone();

        let mut out = Vec::new();
        for record in reader.records() {
            let record = record?;
            out.push(headers.iter().zip(record.iter()).collect());
        }
        Ok(out)
    }
}
